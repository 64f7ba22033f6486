//! First-run identity flow: email, emailed code, personal details.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::DocumentId;
use crate::media::Attachment;
use crate::validation::{
    is_present, is_valid_email, is_valid_phone, truncate_on_char_boundary, ProfileField,
    ValidationError,
};
use crate::{MAX_NAME_BYTES, VERIFICATION_CODE_LENGTH};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnboardingStep {
    #[default]
    EmailEntry,
    CodeEntry,
    ProfileForm,
    Done,
}

impl OnboardingStep {
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::EmailEntry => 0,
            Self::CodeEntry => 1,
            Self::ProfileForm => 2,
            Self::Done => 3,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EmailEntry => "email_entry",
            Self::CodeEntry => "code_entry",
            Self::ProfileForm => "profile_form",
            Self::Done => "done",
        }
    }
}

/// Six single-character inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeCells([Option<char>; VERIFICATION_CODE_LENGTH]);

impl CodeCells {
    /// Keeps the first non-whitespace character of `value`; empty input
    /// clears the cell. Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, value: &str) {
        if let Some(cell) = self.0.get_mut(index) {
            *cell = value.chars().find(|c| !c.is_whitespace());
        }
    }

    #[must_use]
    pub fn filled(&self) -> usize {
        self.0.iter().filter(|cell| cell.is_some()).count()
    }

    #[must_use]
    pub fn cells(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|cell| cell.map(String::from).unwrap_or_default())
            .collect()
    }

    pub fn code(&self) -> Result<String, ValidationError> {
        let filled = self.filled();
        if filled < VERIFICATION_CODE_LENGTH {
            return Err(ValidationError::IncompleteCode { filled });
        }
        Ok(self.0.iter().flatten().collect())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Per-field inline errors on the profile form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileErrors {
    pub first_name: bool,
    pub last_name: bool,
    pub email: bool,
    pub phone_number: bool,
}

impl ProfileErrors {
    #[must_use]
    pub const fn any(&self) -> bool {
        self.first_name || self.last_name || self.email || self.phone_number
    }

    #[must_use]
    pub fn count(&self) -> usize {
        [self.first_name, self.last_name, self.email, self.phone_number]
            .into_iter()
            .filter(|flag| *flag)
            .count()
    }
}

/// A validated profile as written to the document store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub profile_image_url: Option<String>,
}

impl fmt::Debug for PersonalProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersonalProfile")
            .field("has_profile_image", &self.profile_image_url.is_some())
            .finish_non_exhaustive()
    }
}

/// The profile kept on device once onboarding completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredProfile {
    pub document_id: DocumentId,
    pub profile: PersonalProfile,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub profile_image: Option<Attachment>,
    pub errors: ProfileErrors,
}

impl fmt::Debug for ProfileForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileForm")
            .field("profile_image", &self.profile_image)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl ProfileForm {
    pub fn set(&mut self, field: ProfileField, value: &str) {
        let value = truncate_on_char_boundary(value, MAX_NAME_BYTES).to_owned();
        match field {
            ProfileField::FirstName => self.first_name = value,
            ProfileField::LastName => self.last_name = value,
            ProfileField::Email => self.email = value,
            ProfileField::PhoneNumber => self.phone_number = value,
        }
    }

    /// Validates every field, recording inline errors. On success the
    /// profile still lacks its image URL, which is filled in after upload.
    pub fn validate(&mut self) -> Result<PersonalProfile, ValidationError> {
        self.errors = ProfileErrors {
            first_name: !is_present(&self.first_name),
            last_name: !is_present(&self.last_name),
            email: !is_valid_email(&self.email),
            phone_number: !is_valid_phone(&self.phone_number),
        };
        if self.errors.any() {
            return Err(ValidationError::InvalidForm(self.errors.count()));
        }
        Ok(PersonalProfile {
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            profile_image_url: None,
        })
    }
}

/// The onboarding state machine.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Onboarding {
    pub step: OnboardingStep,
    pub email: String,
    pub email_invalid: bool,
    pub code: CodeCells,
    pub code_incomplete: bool,
    pub form: ProfileForm,
    pub form_invalid: bool,
    /// Set once the profile is saved; cleared when the user acknowledges.
    pub account_created: Option<StoredProfile>,
    pub request_in_flight: bool,
}

impl fmt::Debug for Onboarding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Onboarding")
            .field("step", &self.step)
            .field("email_invalid", &self.email_invalid)
            .field("code_filled", &self.code.filled())
            .field("form", &self.form)
            .field("account_created", &self.account_created.is_some())
            .field("request_in_flight", &self.request_in_flight)
            .finish()
    }
}

impl Onboarding {
    /// Already onboarded on a previous launch.
    #[must_use]
    pub fn completed() -> Self {
        Self {
            step: OnboardingStep::Done,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self.step, OnboardingStep::Done)
    }

    pub fn set_email(&mut self, email: &str) {
        self.email = truncate_on_char_boundary(email.trim(), MAX_NAME_BYTES).to_owned();
    }

    /// Returns the email to send the code to, or flags the inline error.
    pub fn submit_email(&mut self) -> Result<String, ValidationError> {
        self.email_invalid = !is_valid_email(&self.email);
        if self.email_invalid {
            return Err(ValidationError::InvalidEmail);
        }
        Ok(self.email.clone())
    }

    pub fn code_sent(&mut self) {
        self.code.clear();
        self.code_incomplete = false;
        self.step = OnboardingStep::CodeEntry;
    }

    /// Returns `(email, code)` to verify, or flags an incomplete code.
    pub fn submit_code(&mut self) -> Result<(String, String), ValidationError> {
        match self.code.code() {
            Ok(code) => {
                self.code_incomplete = false;
                Ok((self.email.clone(), code))
            }
            Err(e) => {
                self.code_incomplete = true;
                Err(e)
            }
        }
    }

    pub fn code_verified(&mut self) {
        if self.form.email.is_empty() {
            self.form.email = self.email.clone();
        }
        self.step = OnboardingStep::ProfileForm;
    }

    pub fn submit_profile(&mut self) -> Result<PersonalProfile, ValidationError> {
        let result = self.form.validate();
        self.form_invalid = result.is_err();
        result
    }

    pub fn profile_saved(&mut self, stored: StoredProfile) {
        self.account_created = Some(stored);
    }

    /// Returns the saved profile and finishes onboarding.
    pub fn acknowledge(&mut self) -> Option<StoredProfile> {
        let stored = self.account_created.take()?;
        *self = Self::completed();
        Some(stored)
    }
}
