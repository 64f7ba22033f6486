//! Projection of the model for the shell. Everything here is derived; the
//! shell never sees the model itself.

use serde::{Deserialize, Serialize};

use crate::media::MediaKind;
use crate::model::{Alert, GateStatus, Model};
use crate::onboarding::{Onboarding, OnboardingStep, ProfileErrors};
use crate::report::EmergencyCategory;
use crate::{messages, ErrorSeverity};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Screen {
    Loading {
        message: Option<String>,
    },
    PermissionsRequired {
        message: String,
    },
    VerifyEmail {
        step: u8,
        email: String,
        email_error: Option<String>,
        is_busy: bool,
    },
    EnterCode {
        step: u8,
        email: String,
        cells: Vec<String>,
        code_error: Option<String>,
        is_busy: bool,
    },
    PersonalInfo(PersonalInfoView),
    Main(CaptureView),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PersonalInfoView {
    pub step: u8,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub profile_image_uri: Option<String>,
    pub errors: ProfileErrors,
    pub form_error: Option<String>,
    /// Confirmation the user has to acknowledge before the main screen.
    pub account_created: Option<String>,
    pub is_busy: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CategoryOption {
    pub category: EmergencyCategory,
    pub label: String,
    pub selected: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AttachmentView {
    pub uri: String,
    pub is_video: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CaptureView {
    pub primary_label: String,
    pub primary_enabled: bool,
    pub options_visible: bool,
    pub categories: Vec<CategoryOption>,
    pub selected: Option<EmergencyCategory>,
    /// Description and attachment controls appear once a category is chosen.
    pub show_details: bool,
    pub description: String,
    pub attachment: Option<AttachmentView>,
    pub send_enabled: bool,
    pub countdown_label: Option<String>,
    pub cancel_visible: bool,
    pub is_waiting: bool,
    pub notice: String,
    pub home_enabled: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Error,
    Notice,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AlertView {
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    pub error_code: Option<String>,
    pub is_transient: bool,
}

impl From<&Alert> for AlertView {
    fn from(alert: &Alert) -> Self {
        match alert {
            Alert::Error(e) => Self {
                kind: AlertKind::Error,
                title: e.title.clone(),
                message: e.user_facing_message(),
                error_code: Some(e.code().to_string()),
                is_transient: e.severity == ErrorSeverity::Transient,
            },
            Alert::Notice(notice) => Self {
                kind: AlertKind::Notice,
                title: notice.title.clone(),
                message: notice.message.clone(),
                error_code: None,
                is_transient: true,
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SettingsView {
    pub dark_mode: bool,
    pub profile_name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ViewModel {
    pub screen: Screen,
    pub alert: Option<AlertView>,
    pub settings: Option<SettingsView>,
    pub dark_mode: bool,
}

impl ViewModel {
    #[must_use]
    pub fn from_model(model: &Model) -> Self {
        let screen = match model.gate.status() {
            GateStatus::Requesting => Screen::Loading {
                message: Some(messages::REQUESTING_PERMISSIONS.into()),
            },
            GateStatus::Denied => Screen::PermissionsRequired {
                message: messages::PERMISSIONS_REQUIRED.into(),
            },
            GateStatus::Granted if !model.restore.is_complete() => {
                Screen::Loading { message: None }
            }
            GateStatus::Granted => onboarding_screen(&model.onboarding)
                .unwrap_or_else(|| Screen::Main(capture_view(model))),
        };

        let settings = model.settings_open.then(|| SettingsView {
            dark_mode: model.dark_mode(),
            profile_name: model.profile.as_ref().map(|stored| {
                format!(
                    "{} {}",
                    stored.profile.first_name, stored.profile.last_name
                )
            }),
        });

        Self {
            screen,
            alert: model.alert.as_ref().map(AlertView::from),
            settings,
            dark_mode: model.dark_mode(),
        }
    }
}

fn onboarding_screen(onboarding: &Onboarding) -> Option<Screen> {
    let step = onboarding.step.index();
    let is_busy = onboarding.request_in_flight;
    let screen = match onboarding.step {
        OnboardingStep::Done => return None,
        OnboardingStep::EmailEntry => Screen::VerifyEmail {
            step,
            email: onboarding.email.clone(),
            email_error: onboarding
                .email_invalid
                .then(|| messages::INVALID_EMAIL.into()),
            is_busy,
        },
        OnboardingStep::CodeEntry => Screen::EnterCode {
            step,
            email: onboarding.email.clone(),
            cells: onboarding.code.cells(),
            code_error: onboarding
                .code_incomplete
                .then(|| messages::INCOMPLETE_CODE.into()),
            is_busy,
        },
        OnboardingStep::ProfileForm => {
            let form = &onboarding.form;
            Screen::PersonalInfo(PersonalInfoView {
                step,
                first_name: form.first_name.clone(),
                last_name: form.last_name.clone(),
                email: form.email.clone(),
                phone_number: form.phone_number.clone(),
                profile_image_uri: form.profile_image.as_ref().map(|a| a.uri.clone()),
                errors: form.errors,
                form_error: onboarding
                    .form_invalid
                    .then(|| messages::INVALID_FORM.into()),
                account_created: onboarding
                    .account_created
                    .as_ref()
                    .map(|_| messages::ACCOUNT_CREATED.into()),
                is_busy,
            })
        }
    };
    Some(screen)
}

fn capture_view(model: &Model) -> CaptureView {
    let draft = &model.draft;
    let locked = model.capture_locked();
    let is_waiting = model.countdown.is_sent();
    let remaining = model.countdown.remaining();

    let categories = EmergencyCategory::ALL
        .iter()
        .map(|&category| CategoryOption {
            category,
            label: category.as_str().to_owned(),
            selected: draft.category == Some(category),
        })
        .collect();

    CaptureView {
        primary_label: if is_waiting {
            messages::WAITING_FOR_RESPONSE.into()
        } else {
            messages::EMERGENCY.into()
        },
        primary_enabled: !locked,
        options_visible: draft.options_visible && !locked,
        categories,
        selected: draft.category,
        show_details: draft.category.is_some(),
        description: draft.description.as_str().to_owned(),
        attachment: draft.attachment.as_ref().map(|a| AttachmentView {
            uri: a.uri.clone(),
            is_video: a.kind == MediaKind::Video,
        }),
        send_enabled: draft.is_ready() && !locked,
        countdown_label: remaining.map(|n| format!("Sending in {n}...")),
        cancel_visible: remaining.is_some(),
        is_waiting,
        notice: messages::RESPONSE_TEAM_NOTICE.into(),
        home_enabled: !locked,
    }
}
