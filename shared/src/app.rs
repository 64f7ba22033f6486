use tracing::{debug, info, warn};

use crate::backend::{firestore, realtime, storage, verification, BackendError};
use crate::capabilities::kv::{self, StoreKey};
use crate::capabilities::{
    Accuracy, CameraError, Capabilities, DevicePermission, LibraryPickConfig, PhotoConfig,
    VideoConfig,
};
use crate::config::Endpoints;
use crate::countdown::{Generation, TickOutcome};
use crate::event::{CaptureIntent, Event, ObjectPath};
use crate::media::{self, MediaKind};
use crate::model::{Model, PermissionDecision};
use crate::onboarding::{Onboarding, PersonalProfile, StoredProfile};
use crate::settings::Preferences;
use crate::submission::{NextStep, SubmitError, Submission};
use crate::view::ViewModel;
use crate::{
    messages, now_utc, AppError, ErrorKind, COUNTDOWN_TICK_MS, PROFILE_IMAGE_PREFIX,
};

#[derive(Default)]
pub struct App;

impl App {
    /// Runs `send` against the configured endpoints.
    fn send_with<F>(model: &Model, send: F) -> Result<(), BackendError>
    where
        F: FnOnce(&Endpoints) -> Result<(), BackendError>,
    {
        match &model.endpoints {
            Some(endpoints) => send(endpoints),
            None => Err(BackendError::NotConfigured),
        }
    }

    fn backend_kind(err: &BackendError) -> ErrorKind {
        match err {
            BackendError::NotConfigured | BackendError::Endpoint(_) => ErrorKind::Configuration,
            BackendError::Media(_) => ErrorKind::Media,
            BackendError::Encode(_)
            | BackendError::Transport(_)
            | BackendError::Rejected { .. }
            | BackendError::MalformedResponse(_) => ErrorKind::Network,
        }
    }

    fn backend_alert(err: &BackendError, message: &str) -> AppError {
        AppError::new(Self::backend_kind(err), message).with_internal(err.to_string())
    }

    /// Verification failures show the server's message when it sent one.
    fn verification_alert(err: &BackendError, fallback: &str) -> AppError {
        Self::backend_alert(err, err.server_message().unwrap_or(fallback))
    }

    fn camera_alert(err: &CameraError) -> AppError {
        match err {
            CameraError::PermissionDenied(permission) => {
                AppError::permission_denied(Self::permission_message(*permission))
            }
            other => AppError::new(ErrorKind::Camera, messages::MEDIA_CAPTURE_FAILED)
                .with_internal(other.to_string()),
        }
    }

    const fn permission_message(permission: DevicePermission) -> &'static str {
        match permission {
            DevicePermission::Camera => messages::CAMERA_PERMISSION,
            DevicePermission::Microphone => messages::MICROPHONE_PERMISSION,
        }
    }

    fn persist<T: serde::Serialize>(caps: &Capabilities, key: StoreKey, value: &T) {
        let result = kv::save(&caps.key_value, key, value, |key, result| Event::StoreSaved {
            key,
            result,
        });
        if let Err(e) = result {
            warn!(key = %key, error = %e, "could not persist value");
        }
    }

    fn decode_stored<T: serde::de::DeserializeOwned>(
        key: StoreKey,
        result: Result<Option<Vec<u8>>, kv::StoreError>,
    ) -> Option<T> {
        match result {
            Ok(Some(bytes)) => match kv::decode(&bytes) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key = %key, error = %e, "discarding unreadable stored value");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "could not read stored value");
                None
            }
        }
    }

    // --- Onboarding ---

    fn store_profile(model: &mut Model, caps: &Capabilities, profile: PersonalProfile) {
        match Self::send_with(model, |endpoints| {
            firestore::create_profile(&caps.http, endpoints, &profile)
        }) {
            Ok(()) => {
                model.pending_profile = Some(profile);
                model.onboarding.request_in_flight = true;
            }
            Err(e) => {
                Self::profile_failed(model, Self::backend_alert(&e, messages::PROFILE_SAVE_FAILED));
            }
        }
    }

    fn profile_failed(model: &mut Model, error: AppError) {
        warn!(error = %error, "profile could not be saved");
        model.pending_profile = None;
        model.onboarding.request_in_flight = false;
        model.show_error(error);
    }

    // --- Capture ---

    /// Both photo and video start by asking for the camera; video then asks
    /// for the microphone.
    fn request_capture(model: &Model, caps: &Capabilities, intent: CaptureIntent) {
        if model.capture_locked() {
            debug!(?intent, "capture locked");
            return;
        }
        Self::request_device_permission(caps, intent, DevicePermission::Camera);
    }

    fn request_device_permission(
        caps: &Capabilities,
        intent: CaptureIntent,
        permission: DevicePermission,
    ) {
        caps.camera.request_permission(permission, move |result| {
            Event::DevicePermissionResolved {
                intent,
                permission,
                result,
            }
        });
    }

    // --- Countdown and submission ---

    fn schedule_tick(caps: &Capabilities, generation: Generation) {
        caps.timer
            .after(generation.0, COUNTDOWN_TICK_MS, move |output| Event::CountdownTick {
                generation,
                output,
            });
    }

    fn begin_submission(model: &mut Model, caps: &Capabilities) {
        let Some(report) = model.draft.snapshot() else {
            warn!("countdown expired without a category");
            model.countdown.failed();
            return;
        };
        info!(report_id = %report.id, category = %report.category, "submitting report");
        model.submission = Some(Submission::begin(report));
        caps.location
            .current_position(Accuracy::High, Event::PositionResolved);
    }

    fn advance<F>(model: &mut Model, caps: &Capabilities, step: F)
    where
        F: FnOnce(&mut Submission) -> Result<NextStep, SubmitError>,
    {
        let Some(submission) = model.submission.as_mut() else {
            debug!("no submission in progress");
            return;
        };
        let next = match step(&mut *submission) {
            Ok(next) => {
                info!(stage = submission.stage().name(), "submission advanced");
                next
            }
            Err(e @ SubmitError::OutOfOrder { .. }) => {
                warn!(error = %e, "ignoring out-of-order submission event");
                return;
            }
            Err(SubmitError::Media(e)) => {
                Self::submission_failed(model, ErrorKind::Media, &e.to_string());
                return;
            }
        };

        let result = match next {
            NextStep::LoadMedia { uri } => {
                caps.camera.load_asset(uri, Event::ReportMediaLoaded);
                Ok(())
            }
            NextStep::Upload { path, payload } => Self::send_with(model, |endpoints| {
                storage::upload(&caps.http, endpoints, &path, payload, Event::ReportMediaUploaded)
            }),
            NextStep::WriteRecord(report) => Self::send_with(model, |endpoints| {
                realtime::push_report(&caps.http, endpoints, &report)
            }),
        };
        if let Err(e) = result {
            Self::submission_failed(model, Self::backend_kind(&e), &e.to_string());
        }
    }

    /// Ends the submission. The draft stays so the user can send again.
    fn submission_failed(model: &mut Model, kind: ErrorKind, cause: &str) {
        let submission = model.submission.take();
        if let Some(object) = submission.as_ref().and_then(Submission::uploaded_object) {
            warn!(object = %object, "uploaded media left without a record");
            model.orphaned_media.push(object.clone());
        }
        warn!(
            stage = submission.as_ref().map(|s| s.stage().name()),
            cause, "report submission failed"
        );
        model.countdown.failed();
        model.show_error(AppError::new(kind, messages::REPORT_SEND_FAILED).with_internal(cause));
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(
            event = event.name(),
            user_initiated = event.is_user_initiated(),
            "handling event"
        );

        match event {
            Event::Configure(config) => match config.validate() {
                Ok(endpoints) => {
                    info!(bucket = endpoints.storage_bucket(), "backend configured");
                    model.endpoints = Some(endpoints);
                }
                Err(e) => {
                    warn!(error = %e, "rejected backend configuration");
                    model.endpoints = None;
                    model.show_error(
                        AppError::new(ErrorKind::Configuration, e.to_string())
                            .with_internal(e.to_string()),
                    );
                }
            },

            Event::AppStarted => {
                if model.gate.location == PermissionDecision::Pending {
                    caps.location
                        .request_permission(Event::LocationPermissionResolved);
                }
                for key in StoreKey::ALL {
                    kv::load(&caps.key_value, key, |key, result| Event::StoreLoaded {
                        key,
                        result,
                    });
                }
            }

            Event::SystemColorSchemeChanged { dark } => {
                model.system_dark = dark;
            }

            Event::LocationPermissionResolved(result) => {
                let granted = match result {
                    Ok(status) => status.is_granted(),
                    Err(e) => {
                        warn!(error = %e, "location permission request failed");
                        false
                    }
                };
                model.gate.location = PermissionDecision::from_granted(granted);
                info!(granted, "location permission resolved");
                if granted {
                    caps.notifications
                        .request_permission(Event::NotificationPermissionResolved);
                } else {
                    model.show_error(AppError::permission_denied(messages::LOCATION_PERMISSION));
                }
            }

            Event::NotificationPermissionResolved(result) => {
                let granted = match result {
                    Ok(state) => state.is_authorized(),
                    Err(e) => {
                        warn!(error = %e, "notification permission request failed");
                        false
                    }
                };
                model.gate.notifications = PermissionDecision::from_granted(granted);
                info!(granted, "notification permission resolved");
                if !granted {
                    model.show_error(AppError::permission_denied(
                        messages::NOTIFICATION_PERMISSION,
                    ));
                }
            }

            Event::StoreLoaded { key, result } => match key {
                StoreKey::Preferences => {
                    model.restore.preferences = true;
                    if let Some(preferences) = Self::decode_stored::<Preferences>(key, result) {
                        model.preferences = preferences;
                    }
                }
                StoreKey::Profile => {
                    model.restore.profile = true;
                    if let Some(stored) = Self::decode_stored::<StoredProfile>(key, result) {
                        info!("restored profile, skipping onboarding");
                        model.onboarding = Onboarding::completed();
                        model.profile = Some(stored);
                    }
                }
            },

            Event::StoreSaved { key, result } => match result {
                Ok(()) => debug!(key = %key, "value persisted"),
                Err(e) => warn!(key = %key, error = %e, "could not persist value"),
            },

            // --- Onboarding ---
            Event::EmailChanged { email } => {
                model.onboarding.set_email(&email);
            }

            Event::SubmitEmail => {
                if model.onboarding.request_in_flight {
                    return;
                }
                let Ok(email) = model.onboarding.submit_email() else {
                    debug!("email rejected");
                    caps.render.render();
                    return;
                };
                match Self::send_with(model, |endpoints| {
                    verification::send_code(&caps.http, endpoints, &email)
                }) {
                    Ok(()) => model.onboarding.request_in_flight = true,
                    Err(e) => {
                        model.show_error(Self::verification_alert(&e, messages::CODE_SEND_FAILED));
                    }
                }
            }

            Event::VerificationCodeSent(result) => {
                model.onboarding.request_in_flight = false;
                match result {
                    Ok(()) => {
                        model.onboarding.code_sent();
                        info!(step = model.onboarding.step.name(), "verification code sent");
                        model.show_notice(messages::SUCCESS_TITLE, messages::CODE_SENT);
                    }
                    Err(e) => {
                        warn!(error = %e, "sending verification code failed");
                        model.show_error(Self::verification_alert(&e, messages::CODE_SEND_FAILED));
                    }
                }
            }

            Event::CodeCellChanged { index, value } => {
                model.onboarding.code.set(index, &value);
            }

            Event::SubmitCode => {
                if model.onboarding.request_in_flight {
                    return;
                }
                let Ok((email, code)) = model.onboarding.submit_code() else {
                    debug!(filled = model.onboarding.code.filled(), "incomplete code");
                    caps.render.render();
                    return;
                };
                match Self::send_with(model, |endpoints| {
                    verification::verify_code(&caps.http, endpoints, &email, &code)
                }) {
                    Ok(()) => model.onboarding.request_in_flight = true,
                    Err(e) => {
                        model.show_error(Self::verification_alert(
                            &e,
                            messages::CODE_VERIFY_FAILED,
                        ));
                    }
                }
            }

            Event::CodeVerified(result) => {
                model.onboarding.request_in_flight = false;
                match result {
                    Ok(()) => {
                        model.onboarding.code_verified();
                        info!(step = model.onboarding.step.name(), "email verified");
                        model.show_notice(messages::SUCCESS_TITLE, messages::EMAIL_VERIFIED);
                    }
                    Err(e) => {
                        warn!(error = %e, "code verification failed");
                        model.show_error(Self::verification_alert(
                            &e,
                            messages::CODE_VERIFY_FAILED,
                        ));
                    }
                }
            }

            Event::ProfileFieldChanged { field, value } => {
                debug!(field = %field, "profile field changed");
                model.onboarding.form.set(field, &value);
            }

            Event::PickProfileImage => {
                caps.camera
                    .pick_from_library(LibraryPickConfig::profile_photo(), Event::ProfileImagePicked);
            }

            Event::ProfileImagePicked(result) => match result {
                Ok(Some(asset)) => {
                    model.onboarding.form.profile_image = Some(asset.into_attachment());
                }
                Ok(None) => debug!("profile image pick cancelled"),
                Err(e) => {
                    warn!(error = %e, "profile image pick failed");
                    model.show_error(Self::camera_alert(&e));
                }
            },

            Event::ClearProfileImage => {
                model.onboarding.form.profile_image = None;
            }

            Event::SubmitProfile => {
                if model.onboarding.request_in_flight
                    || model.onboarding.account_created.is_some()
                {
                    return;
                }
                let profile = match model.onboarding.submit_profile() {
                    Ok(profile) => profile,
                    Err(e) => {
                        debug!(error = %e, "profile form rejected");
                        caps.render.render();
                        return;
                    }
                };
                match model.onboarding.form.profile_image.clone() {
                    Some(image) => {
                        model.pending_profile = Some(profile);
                        model.onboarding.request_in_flight = true;
                        caps.camera.load_asset(image.uri, Event::ProfileImageLoaded);
                    }
                    None => Self::store_profile(model, caps, profile),
                }
            }

            Event::ProfileImageLoaded(result) => {
                let payload = match result {
                    Ok(bytes) => media::prepare_upload(MediaKind::Photo, bytes)
                        .map_err(|e| AppError::new(ErrorKind::Media, messages::PROFILE_SAVE_FAILED)
                            .with_internal(e.to_string())),
                    Err(e) => Err(AppError::new(ErrorKind::Camera, messages::PROFILE_SAVE_FAILED)
                        .with_internal(e.to_string())),
                };
                match payload {
                    Ok(payload) => {
                        let path = ObjectPath::new(media::object_path(
                            PROFILE_IMAGE_PREFIX,
                            now_utc().timestamp_millis(),
                        ));
                        if let Err(e) = Self::send_with(model, |endpoints| {
                            storage::upload(
                                &caps.http,
                                endpoints,
                                &path,
                                payload,
                                Event::ProfileImageUploaded,
                            )
                        }) {
                            Self::profile_failed(
                                model,
                                Self::backend_alert(&e, messages::PROFILE_SAVE_FAILED),
                            );
                        }
                    }
                    Err(error) => Self::profile_failed(model, error),
                }
            }

            Event::ProfileImageUploaded(result) => match result {
                Ok(url) => {
                    let Some(mut profile) = model.pending_profile.take() else {
                        warn!("profile image uploaded with no profile pending");
                        return;
                    };
                    profile.profile_image_url = Some(url.0);
                    Self::store_profile(model, caps, profile);
                }
                Err(e) => {
                    Self::profile_failed(model, Self::backend_alert(&e, messages::PROFILE_SAVE_FAILED));
                }
            },

            Event::ProfileStored(result) => {
                model.onboarding.request_in_flight = false;
                match result {
                    Ok(document_id) => {
                        let Some(profile) = model.pending_profile.take() else {
                            warn!("profile stored with no profile pending");
                            return;
                        };
                        info!(document_id = %document_id, "profile saved");
                        model.onboarding.profile_saved(StoredProfile {
                            document_id,
                            profile,
                        });
                    }
                    Err(e) => {
                        Self::profile_failed(model, Self::backend_alert(&e, messages::PROFILE_SAVE_FAILED));
                    }
                }
            }

            Event::AcknowledgeAccountCreated => {
                if let Some(stored) = model.onboarding.acknowledge() {
                    info!(step = model.onboarding.step.name(), "onboarding complete");
                    Self::persist(caps, StoreKey::Profile, &stored);
                    model.profile = Some(stored);
                }
            }

            // --- Capture screen ---
            Event::EmergencyButtonLongPressed => {
                if model.capture_locked() {
                    debug!("capture locked, ignoring long press");
                } else {
                    model.draft.toggle_options();
                }
            }

            Event::CategorySelected { category } => {
                if !model.capture_locked() {
                    model.draft.select(category);
                }
            }

            Event::DescriptionChanged { text } => {
                if !model.capture_locked() {
                    model.draft.set_description(&text);
                }
            }

            Event::CapturePhotoRequested => {
                Self::request_capture(model, caps, CaptureIntent::Photo);
            }

            Event::RecordVideoRequested => {
                Self::request_capture(model, caps, CaptureIntent::Video);
            }

            Event::DevicePermissionResolved {
                intent,
                permission,
                result,
            } => {
                let granted = match result {
                    Ok(status) => status.is_granted(),
                    Err(e) => {
                        warn!(error = %e, ?permission, "device permission request failed");
                        false
                    }
                };
                if !granted {
                    model.show_error(AppError::permission_denied(Self::permission_message(
                        permission,
                    )));
                } else if model.capture_locked() {
                    debug!(?intent, ?permission, "capture locked after permission granted");
                } else {
                    match (intent, permission) {
                        (CaptureIntent::Photo, _) => {
                            caps.camera
                                .capture_photo(PhotoConfig::default(), Event::MediaCaptured);
                        }
                        (CaptureIntent::Video, DevicePermission::Camera) => {
                            Self::request_device_permission(
                                caps,
                                intent,
                                DevicePermission::Microphone,
                            );
                        }
                        (CaptureIntent::Video, DevicePermission::Microphone) => {
                            caps.camera
                                .record_video(VideoConfig::default(), Event::MediaCaptured);
                        }
                    }
                }
            }

            Event::MediaCaptured(result) => match result {
                Ok(Some(asset)) if model.capture_locked() => {
                    warn!(kind = ?asset.kind, "capture finished after send, discarded");
                }
                Ok(Some(asset)) => model.draft.attach(asset.into_attachment()),
                Ok(None) => debug!("capture cancelled"),
                Err(e) => {
                    warn!(error = %e, "capture failed");
                    model.show_error(Self::camera_alert(&e));
                }
            },

            Event::ClearAttachment => {
                if !model.capture_locked() {
                    model.draft.clear_attachment();
                }
            }

            Event::HomePressed => {
                if model.capture_locked() {
                    debug!("capture locked, draft kept");
                } else {
                    model.draft.reset();
                }
            }

            // --- Countdown ---
            Event::SendPressed => {
                if !model.draft.is_ready() {
                    debug!("send pressed without a category");
                    return;
                }
                let generation = model.next_generation();
                match model.countdown.start(generation) {
                    Ok(()) => {
                        info!(generation = generation.0, "countdown started");
                        Self::schedule_tick(caps, generation);
                    }
                    Err(e) => debug!(error = %e, "send ignored"),
                }
            }

            Event::CancelPressed => match model.countdown.cancel() {
                Some(generation) => {
                    info!(generation = generation.0, "countdown cancelled");
                    caps.timer.cancel(generation.0);
                    model.draft.reset();
                }
                None => debug!("nothing to cancel"),
            },

            Event::CountdownTick { generation, output } => {
                if !output.is_elapsed() {
                    debug!(generation = generation.0, "tick cancelled");
                    return;
                }
                match model.countdown.tick(generation) {
                    TickOutcome::Ignored => {
                        debug!(generation = generation.0, "stale tick ignored");
                        return;
                    }
                    TickOutcome::Continue { remaining } => {
                        debug!(remaining, "countdown tick");
                        Self::schedule_tick(caps, generation);
                    }
                    TickOutcome::Expired => {
                        info!(generation = generation.0, "countdown expired");
                        Self::begin_submission(model, caps);
                    }
                }
            }

            // --- Submission ---
            Event::PositionResolved(result) => {
                if model.submission.is_none() {
                    return;
                }
                match result.map_err(|e| e.to_string()).and_then(|position| {
                    position.coordinates().map_err(|e| e.to_string())
                }) {
                    Ok(location) => {
                        Self::advance(model, caps, |s| s.located(location, now_utc()));
                    }
                    Err(cause) => Self::submission_failed(model, ErrorKind::Location, &cause),
                }
            }

            Event::ReportMediaLoaded(result) => {
                if model.submission.is_none() {
                    return;
                }
                match result {
                    Ok(bytes) => Self::advance(model, caps, |s| s.media_loaded(bytes, now_utc())),
                    Err(e) => Self::submission_failed(model, ErrorKind::Camera, &e.to_string()),
                }
            }

            Event::ReportMediaUploaded(result) => {
                if model.submission.is_none() {
                    return;
                }
                match result {
                    Ok(url) => Self::advance(model, caps, |s| s.media_uploaded(url, now_utc())),
                    Err(e) => {
                        Self::submission_failed(model, Self::backend_kind(&e), &e.to_string());
                    }
                }
            }

            Event::ReportStored(result) => {
                if model.submission.is_none() {
                    return;
                }
                match result {
                    Ok(key) => {
                        model.submission = None;
                        info!(record = %key, "report delivered");
                        model.countdown.delivered(key);
                        model.draft.reset();
                    }
                    Err(e) => {
                        Self::submission_failed(model, Self::backend_kind(&e), &e.to_string());
                    }
                }
            }

            // --- Settings ---
            Event::OpenSettings => model.settings_open = true,
            Event::CloseSettings => model.settings_open = false,

            Event::ToggleDarkMode => {
                model.preferences.toggle_dark_mode(model.system_dark);
                info!(theme = ?model.preferences.theme, "theme changed");
                Self::persist(caps, StoreKey::Preferences, &model.preferences);
            }

            Event::EditProfilePressed => {
                info!("edit profile is not available yet");
            }

            Event::DismissAlert => model.alert = None,
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::from_model(model)
    }
}
