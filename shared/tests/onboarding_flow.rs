use crux_core::testing::AppTester;
use shared::backend::BackendError;
use shared::capabilities::CapturedAsset;
use shared::config::BackendConfig;
use shared::event::{DocumentId, MediaUrl};
use shared::media::MediaKind;
use shared::model::{Alert, PermissionDecision};
use shared::onboarding::OnboardingStep;
use shared::validation::ProfileField;
use shared::view::Screen;
use shared::{messages, App, Effect, Event, Model};

fn configured(app: &AppTester<App, Effect>) -> Model {
    let mut model = Model::default();
    model.gate.location = PermissionDecision::Granted;
    model.gate.notifications = PermissionDecision::Granted;
    model.restore.preferences = true;
    model.restore.profile = true;
    app.update(
        Event::Configure(Box::new(BackendConfig {
            verification_base_url: "http://192.168.1.105:8000".into(),
            database_url: "https://lels-default-rtdb.firebaseio.com/".into(),
            storage_bucket: "lels-app.appspot.com".into(),
            project_id: "lels-app".into(),
            api_key: Some("AIzaTest".into()),
            database_secret: None,
        })),
        &mut model,
    );
    model
}

/// `(url, body)` of every HTTP request among `effects`.
fn http_calls(effects: &[Effect]) -> Vec<(String, serde_json::Value)> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Http(request) => Some((
                request.operation.url.clone(),
                serde_json::from_slice(&request.operation.body).unwrap_or_default(),
            )),
            _ => None,
        })
        .collect()
}

fn fill_form(app: &AppTester<App, Effect>, model: &mut Model, phone: &str) {
    for (field, value) in [
        (ProfileField::FirstName, "Ana"),
        (ProfileField::LastName, "Reyes"),
        (ProfileField::PhoneNumber, phone),
    ] {
        app.update(
            Event::ProfileFieldChanged {
                field,
                value: value.into(),
            },
            model,
        );
    }
}

/// Walks email and code entry up to the profile form.
fn verified(app: &AppTester<App, Effect>) -> Model {
    let mut model = configured(app);
    app.update(
        Event::EmailChanged {
            email: "ana@example.com".into(),
        },
        &mut model,
    );
    app.update(Event::SubmitEmail, &mut model);
    app.update(Event::VerificationCodeSent(Ok(())), &mut model);
    for (index, digit) in "482913".chars().enumerate() {
        app.update(
            Event::CodeCellChanged {
                index,
                value: digit.to_string(),
            },
            &mut model,
        );
    }
    app.update(Event::SubmitCode, &mut model);
    app.update(Event::CodeVerified(Ok(())), &mut model);
    model
}

#[test]
fn test_onboarding_flow() {
    let app = AppTester::<App, Effect>::default();
    let mut model = configured(&app);

    let view = app.view(&model);
    assert!(matches!(view.screen, Screen::VerifyEmail { step: 0, .. }));

    // Invalid email never reaches the network.
    app.update(
        Event::EmailChanged {
            email: "user@@example".into(),
        },
        &mut model,
    );
    let update = app.update(Event::SubmitEmail, &mut model);
    assert!(http_calls(&update.effects).is_empty());
    assert!(model.onboarding.email_invalid);

    app.update(
        Event::EmailChanged {
            email: "ana@example.com".into(),
        },
        &mut model,
    );
    let update = app.update(Event::SubmitEmail, &mut model);
    let calls = http_calls(&update.effects);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "http://192.168.1.105:8000/api/send-verification-code");
    assert_eq!(calls[0].1, serde_json::json!({ "email": "ana@example.com" }));
    assert!(model.onboarding.request_in_flight);

    let update = app.update(Event::VerificationCodeSent(Ok(())), &mut model);
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Render(_))));
    assert_eq!(model.onboarding.step, OnboardingStep::CodeEntry);
    assert!(matches!(model.alert, Some(Alert::Notice(_))));
    app.update(Event::DismissAlert, &mut model);

    // Incomplete code is rejected locally.
    for (index, digit) in "482".chars().enumerate() {
        app.update(
            Event::CodeCellChanged {
                index,
                value: digit.to_string(),
            },
            &mut model,
        );
    }
    let update = app.update(Event::SubmitCode, &mut model);
    assert!(http_calls(&update.effects).is_empty());
    assert!(model.onboarding.code_incomplete);

    for (index, digit) in "482913".chars().enumerate() {
        app.update(
            Event::CodeCellChanged {
                index,
                value: format!("{digit}9"),
            },
            &mut model,
        );
    }
    let update = app.update(Event::SubmitCode, &mut model);
    let calls = http_calls(&update.effects);
    assert_eq!(calls[0].0, "http://192.168.1.105:8000/api/verify-code");
    assert_eq!(
        calls[0].1,
        serde_json::json!({ "email": "ana@example.com", "verification_code": "482913" })
    );

    app.update(Event::CodeVerified(Ok(())), &mut model);
    assert_eq!(model.onboarding.step, OnboardingStep::ProfileForm);
    assert_eq!(model.onboarding.form.email, "ana@example.com");

    // Nine digits: inline errors, no request.
    fill_form(&app, &mut model, "091712345");
    let update = app.update(Event::SubmitProfile, &mut model);
    assert!(http_calls(&update.effects).is_empty());
    assert!(model.onboarding.form.errors.phone_number);
    assert!(!model.onboarding.form.errors.first_name);
    let view = app.view(&model);
    match view.screen {
        Screen::PersonalInfo(info) => {
            assert_eq!(info.form_error.as_deref(), Some(messages::INVALID_FORM));
        }
        other => panic!("unexpected screen {other:?}"),
    }

    fill_form(&app, &mut model, "0917123456");
    let update = app.update(Event::SubmitProfile, &mut model);
    let calls = http_calls(&update.effects);
    assert_eq!(
        calls[0].0,
        "https://firestore.googleapis.com/v1/projects/lels-app/databases/(default)/documents/personalInfo?key=AIzaTest"
    );
    assert_eq!(calls[0].1["fields"]["firstname"]["stringValue"], "Ana");
    assert_eq!(calls[0].1["fields"]["phoneNumber"]["stringValue"], "0917123456");
    assert_eq!(calls[0].1["fields"]["profileImageUri"]["stringValue"], "");

    app.update(Event::ProfileStored(Ok(DocumentId::new("doc-1"))), &mut model);
    let view = app.view(&model);
    match view.screen {
        Screen::PersonalInfo(info) => {
            assert_eq!(info.account_created.as_deref(), Some(messages::ACCOUNT_CREATED));
        }
        other => panic!("unexpected screen {other:?}"),
    }

    let update = app.update(Event::AcknowledgeAccountCreated, &mut model);
    assert!(update
        .effects
        .iter()
        .any(|e| matches!(e, Effect::KeyValue(_))));
    assert!(model.onboarding.is_done());
    assert_eq!(
        model.profile.as_ref().map(|p| p.document_id.as_str()),
        Some("doc-1")
    );
    assert!(matches!(app.view(&model).screen, Screen::Main(_)));
}

#[test]
fn test_server_message_is_shown_on_failure() {
    let app = AppTester::<App, Effect>::default();
    let mut model = configured(&app);
    app.update(
        Event::EmailChanged {
            email: "ana@example.com".into(),
        },
        &mut model,
    );
    app.update(Event::SubmitEmail, &mut model);
    app.update(
        Event::VerificationCodeSent(Err(BackendError::Rejected {
            status: 404,
            message: Some("Email not registered".into()),
        })),
        &mut model,
    );

    assert_eq!(model.onboarding.step, OnboardingStep::EmailEntry);
    let alert = app.view(&model).alert.expect("alert");
    assert_eq!(alert.message, "Email not registered");

    app.update(Event::DismissAlert, &mut model);
    app.update(Event::SubmitEmail, &mut model);
    app.update(
        Event::VerificationCodeSent(Err(BackendError::Transport("timeout".into()))),
        &mut model,
    );
    let alert = app.view(&model).alert.expect("alert");
    assert_eq!(alert.message, messages::CODE_SEND_FAILED);
}

#[test]
fn test_profile_photo_is_uploaded_first() {
    let app = AppTester::<App, Effect>::default();
    let mut model = verified(&app);
    fill_form(&app, &mut model, "0917123456");

    let update = app.update(Event::PickProfileImage, &mut model);
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Camera(_))));
    app.update(
        Event::ProfileImagePicked(Ok(Some(CapturedAsset {
            uri: "file:///me.jpg".into(),
            kind: MediaKind::Photo,
            width: Some(800),
            height: Some(600),
            duration_ms: None,
            file_size: None,
        }))),
        &mut model,
    );

    let update = app.update(Event::SubmitProfile, &mut model);
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Camera(_))));
    assert!(http_calls(&update.effects).is_empty());

    let update = app.update(
        Event::ProfileImageLoaded(Ok(vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F'])),
        &mut model,
    );
    let calls = http_calls(&update.effects);
    assert_eq!(calls.len(), 1);
    assert!(calls[0].0.contains("name=profileImages%2F"));

    let update = app.update(
        Event::ProfileImageUploaded(Ok(MediaUrl::new("https://cdn.example/me"))),
        &mut model,
    );
    let calls = http_calls(&update.effects);
    assert_eq!(
        calls[0].1["fields"]["profileImageUri"]["stringValue"],
        "https://cdn.example/me"
    );
}

#[test]
fn test_profile_save_failure_keeps_form() {
    let app = AppTester::<App, Effect>::default();
    let mut model = verified(&app);
    fill_form(&app, &mut model, "0917123456");

    app.update(Event::SubmitProfile, &mut model);
    app.update(
        Event::ProfileStored(Err(BackendError::Rejected {
            status: 500,
            message: Some("internal".into()),
        })),
        &mut model,
    );

    assert_eq!(model.onboarding.step, OnboardingStep::ProfileForm);
    assert_eq!(model.onboarding.form.first_name, "Ana");
    assert!(!model.onboarding.request_in_flight);
    let alert = app.view(&model).alert.expect("alert");
    assert_eq!(alert.message, messages::PROFILE_SAVE_FAILED);
}
