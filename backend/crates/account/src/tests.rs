//! Cross-module tests for the account crate
//!
//! Driven by the in-memory profile store and identity directory.

#[cfg(test)]
mod support {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use crate::application::config::AccountConfig;
    use crate::application::ensure_profile::EnsureProfileUseCase;
    use crate::domain::entity::principal::Principal;
    use crate::domain::value_object::{
        display_name::DisplayName,
        email::Email,
        principal_id::PrincipalId,
        referral_code::{RandomReferralCodes, ReferralCode, ReferralCodeSource},
    };
    use crate::infra::memory::MemoryProfileRepository;

    /// Hands out scripted codes, then random ones
    pub struct ScriptedCodes(Mutex<VecDeque<&'static str>>);

    impl ScriptedCodes {
        pub fn new(codes: &[&'static str]) -> Arc<Self> {
            Arc::new(Self(Mutex::new(codes.iter().copied().collect())))
        }
    }

    impl ReferralCodeSource for ScriptedCodes {
        fn next_code(&self) -> ReferralCode {
            match self.0.lock().unwrap().pop_front() {
                Some(code) => ReferralCode::parse(code).unwrap(),
                None => RandomReferralCodes.next_code(),
            }
        }
    }

    /// Always the same code
    pub struct FixedCode(pub &'static str);

    impl ReferralCodeSource for FixedCode {
        fn next_code(&self) -> ReferralCode {
            ReferralCode::parse(self.0).unwrap()
        }
    }

    pub fn principal(id: &str, email: &str) -> Principal {
        Principal::new(
            PrincipalId::new(id).unwrap(),
            Some(Email::new(email).unwrap()),
            None,
        )
    }

    pub fn name(s: &str) -> DisplayName {
        DisplayName::new(s).unwrap()
    }

    pub fn ensure_profile(
        repo: &Arc<MemoryProfileRepository>,
    ) -> EnsureProfileUseCase<MemoryProfileRepository> {
        EnsureProfileUseCase::new(repo.clone(), Arc::new(AccountConfig::default()))
    }

    pub fn ensure_profile_with(
        repo: &Arc<MemoryProfileRepository>,
        config: AccountConfig,
        codes: Arc<dyn ReferralCodeSource>,
    ) -> EnsureProfileUseCase<MemoryProfileRepository> {
        EnsureProfileUseCase::with_code_source(repo.clone(), Arc::new(config), codes)
    }
}

#[cfg(test)]
mod ensure_profile_tests {
    use std::sync::Arc;

    use super::support::*;
    use crate::application::config::AccountConfig;
    use crate::application::ensure_profile::ProfileOutcome;
    use crate::domain::repository::ProfileRepository;
    use crate::domain::value_object::referral_code::{ReferralCode, ReferrerCode};
    use crate::error::AccountError;
    use crate::infra::memory::MemoryProfileRepository;

    #[tokio::test]
    async fn test_new_profile_without_referrer() {
        let repo = Arc::new(MemoryProfileRepository::new());
        let anna = principal("uid-anna", "a@x.com");

        let outcome = ensure_profile(&repo)
            .execute(&anna, &name("Anna"), None)
            .await
            .unwrap();

        let profile = outcome.created().unwrap().clone();
        assert_eq!(profile.principal_id, anna.id);
        assert_eq!(profile.display_name.as_str(), "Anna");
        assert_eq!(profile.email.as_ref().unwrap().as_str(), "a@x.com");
        assert!(ReferralCode::is_valid(profile.referral_code.as_str()));
        assert!(profile.referred_by.is_none());

        let stored = repo.find_by_principal(&anna.id).await.unwrap().unwrap();
        assert_eq!(stored, profile);
    }

    #[tokio::test]
    async fn test_referred_signup_records_referrer() {
        let repo = Arc::new(MemoryProfileRepository::new());
        let use_case = ensure_profile_with(
            &repo,
            AccountConfig::default(),
            ScriptedCodes::new(&["X7K2P9", "Q4M8Z1"]),
        );

        let a = principal("uid-a", "a@x.com");
        use_case.execute(&a, &name("A"), None).await.unwrap();

        let b = principal("uid-b", "b@x.com");
        let referrer = ReferrerCode::from_query(Some("X7K2P9"));
        let outcome = use_case
            .execute(&b, &name("B"), referrer.as_ref())
            .await
            .unwrap();

        let profile = outcome.created().unwrap();
        assert_eq!(profile.referral_code.as_str(), "Q4M8Z1");
        assert_eq!(profile.referred_by.as_ref(), Some(&a.id));
    }

    #[tokio::test]
    async fn test_unknown_referrer_is_ignored() {
        let repo = Arc::new(MemoryProfileRepository::new());
        let b = principal("uid-b", "b@x.com");
        let referrer = ReferrerCode::from_query(Some("ZZZZZZ"));

        let outcome = ensure_profile(&repo)
            .execute(&b, &name("B"), referrer.as_ref())
            .await
            .unwrap();

        assert!(outcome.created().unwrap().referred_by.is_none());
    }

    #[tokio::test]
    async fn test_referrer_match_is_exact() {
        let repo = Arc::new(MemoryProfileRepository::new());
        let use_case = ensure_profile_with(
            &repo,
            AccountConfig::default(),
            ScriptedCodes::new(&["X7K2P9"]),
        );
        use_case
            .execute(&principal("uid-a", "a@x.com"), &name("A"), None)
            .await
            .unwrap();

        let referrer = ReferrerCode::from_query(Some("x7k2p9"));
        let outcome = use_case
            .execute(&principal("uid-b", "b@x.com"), &name("B"), referrer.as_ref())
            .await
            .unwrap();

        assert!(outcome.created().unwrap().referred_by.is_none());
    }

    #[tokio::test]
    async fn test_second_call_is_noop() {
        let repo = Arc::new(MemoryProfileRepository::new());
        let use_case = ensure_profile(&repo);
        let anna = principal("uid-anna", "a@x.com");

        let first = use_case.execute(&anna, &name("Anna"), None).await.unwrap();
        let first = first.created().unwrap().clone();

        let second = use_case
            .execute(&anna, &name("Someone Else"), None)
            .await
            .unwrap();
        assert_eq!(second, ProfileOutcome::AlreadyExists);

        let stored = repo.find_by_principal(&anna.id).await.unwrap().unwrap();
        assert_eq!(stored.created_at, first.created_at);
        assert_eq!(stored.referral_code, first.referral_code);
        assert_eq!(stored.display_name.as_str(), "Anna");
    }

    #[tokio::test]
    async fn test_concurrent_calls_create_one_profile() {
        let repo = Arc::new(MemoryProfileRepository::new());
        let use_case = Arc::new(ensure_profile(&repo));
        let anna = principal("uid-anna", "a@x.com");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let use_case = use_case.clone();
            let anna = anna.clone();
            handles.push(tokio::spawn(async move {
                use_case.execute(&anna, &name("Anna"), None).await
            }));
        }

        let mut created = 0;
        for handle in handles {
            if let ProfileOutcome::Created(_) = handle.await.unwrap().unwrap() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn test_code_collision_regenerates() {
        let repo = Arc::new(MemoryProfileRepository::new());
        let use_case = ensure_profile_with(
            &repo,
            AccountConfig::default(),
            ScriptedCodes::new(&["AAAAAA", "AAAAAA", "BBBBBB"]),
        );

        let a = use_case
            .execute(&principal("uid-a", "a@x.com"), &name("A"), None)
            .await
            .unwrap();
        let b = use_case
            .execute(&principal("uid-b", "b@x.com"), &name("B"), None)
            .await
            .unwrap();

        assert_eq!(a.created().unwrap().referral_code.as_str(), "AAAAAA");
        assert_eq!(b.created().unwrap().referral_code.as_str(), "BBBBBB");
        assert_eq!(repo.count().await, 2);
    }

    #[tokio::test]
    async fn test_code_collisions_give_up() {
        let repo = Arc::new(MemoryProfileRepository::new());
        let config = AccountConfig {
            referral_code_attempts: 3,
            ..AccountConfig::default()
        };
        let use_case = ensure_profile_with(&repo, config, Arc::new(FixedCode("AAAAAA")));

        use_case
            .execute(&principal("uid-a", "a@x.com"), &name("A"), None)
            .await
            .unwrap();
        let result = use_case
            .execute(&principal("uid-b", "b@x.com"), &name("B"), None)
            .await;

        assert!(matches!(result, Err(AccountError::ReferralCodeExhausted)));
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let repo = Arc::new(MemoryProfileRepository::new());
        repo.set_unavailable(true);

        let result = ensure_profile(&repo)
            .execute(&principal("uid-a", "a@x.com"), &name("A"), None)
            .await;

        assert!(matches!(result, Err(AccountError::Unavailable(_))));
    }
}

#[cfg(test)]
mod account_use_case_tests {
    use std::sync::Arc;

    use crate::application::config::AccountConfig;
    use crate::application::{
        ProviderSignInUseCase, SignInInput, SignInUseCase, SignOutUseCase, SignUpInput,
        SignUpUseCase,
    };
    use crate::domain::gateway::{GatewayFactory, IdentityGateway, ProviderCredential, ProviderToken};
    use crate::domain::repository::ProfileRepository;
    use crate::error::AccountError;
    use crate::infra::memory::{MemoryIdentityDirectory, MemoryProfileRepository};

    fn sign_up_input(email: &str, password: &str, display_name: &str) -> SignUpInput {
        SignUpInput {
            email: email.to_string(),
            password: password.to_string(),
            display_name: display_name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_sign_up_creates_profile_and_sets_name() {
        let directory = MemoryIdentityDirectory::new();
        let gateway = Arc::new(directory.open());
        let repo = Arc::new(MemoryProfileRepository::new());
        let use_case =
            SignUpUseCase::new(gateway.clone(), repo.clone(), Arc::new(AccountConfig::default()));

        let output = use_case
            .execute(sign_up_input(" Anna@X.com ", "secret1", "  Anna  "), None)
            .await
            .unwrap();

        assert_eq!(output.principal.display_name.as_deref(), Some("Anna"));
        assert_eq!(output.principal.email.as_ref().unwrap().as_str(), "anna@x.com");
        let profile = output.profile.created().unwrap();
        assert_eq!(profile.display_name.as_str(), "Anna");
        assert!(repo.find_by_principal(&output.principal.id).await.unwrap().is_some());
        assert!(gateway.subscribe().borrow().is_some());
    }

    #[tokio::test]
    async fn test_empty_name_rejected_before_gateway() {
        let directory = MemoryIdentityDirectory::new();
        // Any gateway call would fail with Unavailable
        directory.set_unavailable(true);
        let use_case = SignUpUseCase::new(
            Arc::new(directory.open()),
            Arc::new(MemoryProfileRepository::new()),
            Arc::new(AccountConfig::default()),
        );

        let result = use_case
            .execute(sign_up_input("a@x.com", "secret1", "   "), None)
            .await;

        match result {
            Err(AccountError::InvalidInput(msg)) => assert_eq!(msg, "Пожалуйста, введите ваше имя."),
            other => panic!("expected InvalidInput, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_gateway_message_surfaced_verbatim() {
        let directory = MemoryIdentityDirectory::new();
        let repo = Arc::new(MemoryProfileRepository::new());
        let config = Arc::new(AccountConfig::default());

        SignUpUseCase::new(Arc::new(directory.open()), repo.clone(), config.clone())
            .execute(sign_up_input("a@x.com", "secret1", "Anna"), None)
            .await
            .unwrap();

        let result = SignUpUseCase::new(Arc::new(directory.open()), repo, config)
            .execute(sign_up_input("a@x.com", "secret1", "Anna"), None)
            .await;

        match result {
            Err(AccountError::Credential(msg)) => assert_eq!(msg, "EMAIL_EXISTS"),
            other => panic!("expected Credential, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_attribution_failure_keeps_account_signed_in() {
        let directory = MemoryIdentityDirectory::new();
        let gateway = Arc::new(directory.open());
        let repo = Arc::new(MemoryProfileRepository::new());
        repo.set_unavailable(true);

        let result = SignUpUseCase::new(gateway.clone(), repo, Arc::new(AccountConfig::default()))
            .execute(sign_up_input("a@x.com", "secret1", "Anna"), None)
            .await;

        assert!(matches!(result, Err(AccountError::Unavailable(_))));
        let principal = gateway.subscribe().borrow().clone().unwrap();
        assert_eq!(principal.display_name.as_deref(), Some("Anna"));
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let directory = MemoryIdentityDirectory::new();
        SignUpUseCase::new(
            Arc::new(directory.open()),
            Arc::new(MemoryProfileRepository::new()),
            Arc::new(AccountConfig::default()),
        )
        .execute(sign_up_input("a@x.com", "secret1", "Anna"), None)
        .await
        .unwrap();

        let use_case = SignInUseCase::new(Arc::new(directory.open()));
        let result = use_case
            .execute(SignInInput {
                email: "a@x.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await;
        assert!(
            matches!(result, Err(AccountError::Credential(ref m)) if m == "INVALID_LOGIN_CREDENTIALS")
        );

        let principal = use_case
            .execute(SignInInput {
                email: "A@X.COM".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(principal.display_name.as_deref(), Some("Anna"));
    }

    #[tokio::test]
    async fn test_provider_sign_in_creates_profile_once() {
        let directory = MemoryIdentityDirectory::new();
        directory
            .add_federated_identity("google.com", "tok-b", Some("b@x.com"), Some("Boris"))
            .await;
        let repo = Arc::new(MemoryProfileRepository::new());
        let config = Arc::new(AccountConfig::default());
        let credential =
            ProviderCredential::new("google.com", ProviderToken::IdToken("tok-b".into())).unwrap();

        let first = ProviderSignInUseCase::new(Arc::new(directory.open()), repo.clone(), config.clone())
            .execute(&credential, None)
            .await
            .unwrap();
        assert!(first.is_new_account);
        let profile = first.profile.unwrap();
        assert_eq!(profile.created().unwrap().display_name.as_str(), "Boris");

        let second = tokio_test::assert_ok!(
            ProviderSignInUseCase::new(Arc::new(directory.open()), repo.clone(), config)
                .execute(&credential, None)
                .await
        );
        assert!(!second.is_new_account);
        assert!(second.profile.is_none());
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn test_provider_without_name_skips_profile() {
        let directory = MemoryIdentityDirectory::new();
        directory
            .add_federated_identity("github.com", "tok-c", None, None)
            .await;
        let repo = Arc::new(MemoryProfileRepository::new());
        let credential =
            ProviderCredential::new("github.com", ProviderToken::AccessToken("tok-c".into()))
                .unwrap();

        let output = ProviderSignInUseCase::new(
            Arc::new(directory.open()),
            repo.clone(),
            Arc::new(AccountConfig::default()),
        )
        .execute(&credential, None)
        .await
        .unwrap();

        assert!(output.is_new_account);
        assert!(output.profile.is_none());
        assert_eq!(repo.count().await, 0);
    }

    #[tokio::test]
    async fn test_sign_out_failure_keeps_state() {
        let directory = MemoryIdentityDirectory::new();
        let gateway = Arc::new(directory.open());
        SignUpUseCase::new(
            gateway.clone(),
            Arc::new(MemoryProfileRepository::new()),
            Arc::new(AccountConfig::default()),
        )
        .execute(sign_up_input("a@x.com", "secret1", "Anna"), None)
        .await
        .unwrap();

        directory.set_unavailable(true);
        SignOutUseCase::new(gateway.clone()).execute().await;
        assert!(gateway.subscribe().borrow().is_some());

        directory.set_unavailable(false);
        SignOutUseCase::new(gateway.clone()).execute().await;
        assert!(gateway.subscribe().borrow().is_none());
    }
}

#[cfg(test)]
mod projection_tests {
    use std::sync::Arc;

    use super::support::*;
    use crate::application::projection::SessionProjection;
    use crate::domain::entity::session_view::{REFERRAL_CODE_PLACEHOLDER, ReferralCodeView};
    use crate::domain::gateway::{GatewayFactory, IdentityGateway};
    use crate::domain::value_object::{email::Email, password::Password};
    use crate::infra::memory::{MemoryIdentityDirectory, MemoryProfileRepository};

    async fn signed_up(
        directory: &MemoryIdentityDirectory,
    ) -> crate::infra::memory::MemoryIdentityGateway {
        let gateway = directory.open();
        gateway
            .register(
                &Email::new("a@x.com").unwrap(),
                &Password::new("secret1".into()).unwrap(),
            )
            .await
            .unwrap();
        gateway
    }

    #[tokio::test]
    async fn test_signed_out_projects_none() {
        let directory = MemoryIdentityDirectory::new();
        let gateway = directory.open();
        let projection =
            SessionProjection::start(&gateway, Arc::new(MemoryProfileRepository::new()));

        assert!(projection.refresh().await.is_none());
        assert!(projection.current().is_none());
        projection.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_profile_shows_placeholder() {
        let directory = MemoryIdentityDirectory::new();
        let gateway = signed_up(&directory).await;
        let projection =
            SessionProjection::start(&gateway, Arc::new(MemoryProfileRepository::new()));

        let view = projection.refresh().await.unwrap();
        assert_eq!(view.referral_code, ReferralCodeView::Generating);
        assert_eq!(view.referral_code.as_str(), REFERRAL_CODE_PLACEHOLDER);
        assert_eq!(view.email.unwrap().as_str(), "a@x.com");
        projection.shutdown().await;
    }

    #[tokio::test]
    async fn test_refresh_picks_up_new_profile() {
        let directory = MemoryIdentityDirectory::new();
        let repo = Arc::new(MemoryProfileRepository::new());
        let gateway = signed_up(&directory).await;
        let projection = SessionProjection::start(&gateway, repo.clone());

        let principal = gateway.subscribe().borrow().clone().unwrap();
        let outcome = ensure_profile(&repo)
            .execute(&principal, &name("Anna"), None)
            .await
            .unwrap();
        let code = outcome.created().unwrap().referral_code.clone();

        let view = projection.refresh().await.unwrap();
        assert_eq!(view.referral_code.ready(), Some(&code));
        assert_eq!(view.display_name.as_deref(), Some("Anna"));
        projection.shutdown().await;
    }

    #[tokio::test]
    async fn test_follows_sign_out() {
        let directory = MemoryIdentityDirectory::new();
        let gateway = signed_up(&directory).await;
        let projection =
            SessionProjection::start(&gateway, Arc::new(MemoryProfileRepository::new()));
        let mut views = projection.subscribe();

        assert!(projection.refresh().await.is_some());

        gateway.sign_out().await.unwrap();
        views
            .wait_for(|view| view.is_none())
            .await
            .unwrap();
        assert!(projection.current().is_none());
        projection.shutdown().await;
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_view() {
        let directory = MemoryIdentityDirectory::new();
        let repo = Arc::new(MemoryProfileRepository::new());
        let gateway = signed_up(&directory).await;
        let principal = gateway.subscribe().borrow().clone().unwrap();
        ensure_profile(&repo)
            .execute(&principal, &name("Anna"), None)
            .await
            .unwrap();
        let projection = SessionProjection::start(&gateway, repo.clone());
        let before = projection.refresh().await.unwrap();

        repo.set_unavailable(true);
        let after = projection.refresh().await.unwrap();

        assert_eq!(before, after);
        assert!(after.referral_code.ready().is_some());
        projection.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_following() {
        let directory = MemoryIdentityDirectory::new();
        let gateway = signed_up(&directory).await;
        let projection =
            SessionProjection::start(&gateway, Arc::new(MemoryProfileRepository::new()));
        assert!(projection.refresh().await.is_some());

        projection.shutdown().await;
        // Second call is a no-op
        projection.shutdown().await;

        gateway.sign_out().await.unwrap();
        tokio::task::yield_now().await;
        // No task left to observe the sign-out
        assert!(projection.current().is_some());
        assert!(projection.refresh().await.is_some());
    }
}

#[cfg(test)]
mod http_tests {
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::application::config::AccountConfig;
    use crate::domain::repository::ProfileRepository;
    use crate::domain::value_object::principal_id::PrincipalId;
    use crate::infra::memory::{MemoryIdentityDirectory, MemoryProfileRepository};
    use crate::presentation::handlers::AccountAppState;
    use crate::presentation::router::account_router_generic;

    struct TestApp {
        router: Router,
        state: AccountAppState<MemoryIdentityDirectory, MemoryProfileRepository>,
        identities: MemoryIdentityDirectory,
    }

    fn app() -> TestApp {
        let config = AccountConfig {
            page_origin: "https://moscow.life".to_string(),
            ..AccountConfig::development()
        };
        let identities = MemoryIdentityDirectory::new();
        let state = AccountAppState::new(
            identities.clone(),
            MemoryProfileRepository::new(),
            config,
        );
        let router = Router::new().nest("/api", account_router_generic(state.clone()));
        TestApp {
            router,
            state,
            identities,
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, cookie, body)
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    /// Load the page and sign up; returns the session cookie and user json
    async fn sign_up(router: &Router, query: &str, email: &str, name: &str) -> (String, Value) {
        let (_, cookie, _) = send(router, get(&format!("/api/page{}", query), None)).await;
        let cookie = cookie.unwrap();
        let (status, _, body) = send(
            router,
            post(
                "/api/account/signup",
                Some(&cookie),
                json!({ "email": email, "password": "secret1", "displayName": name }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        (cookie, body["user"].clone())
    }

    #[tokio::test]
    async fn test_page_opens_session() {
        let app = app();
        let (status, cookie, body) = send(&app.router, get("/api/page", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(cookie.unwrap().starts_with("page_session="));
        assert!(body["user"].is_null());
        assert!(body["referralLink"].is_null());
        assert_eq!(body["links"]["findHousing"], "https://tally.so/r/3Ey154");
        assert_eq!(body["links"]["listHousing"], "https://tally.so/r/mBMGOR");
        assert_eq!(app.state.sessions.len().await, 1);
    }

    #[tokio::test]
    async fn test_existing_session_keeps_cookie() {
        let app = app();
        let (_, cookie, _) = send(&app.router, get("/api/page", None)).await;
        let (status, again, _) = send(&app.router, get("/api/page", cookie.as_deref())).await;

        assert_eq!(status, StatusCode::OK);
        assert!(again.is_none());
        assert_eq!(app.state.sessions.len().await, 1);
    }

    #[tokio::test]
    async fn test_account_routes_require_session() {
        let app = app();
        let (status, _, body) = send(
            &app.router,
            post(
                "/api/account/signin",
                None,
                json!({ "email": "a@x.com", "password": "secret1" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Session not found or expired");

        let (status, _, _) = send(
            &app.router,
            get("/api/referral/link", Some("page_session=forged.token")),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_sign_up_returns_code_and_link() {
        let app = app();
        let (cookie, user) = sign_up(&app.router, "", "anna@x.com", "Anna").await;

        assert_eq!(user["displayName"], "Anna");
        assert_eq!(user["greetingName"], "Anna");
        assert_eq!(user["referralCodeReady"], true);
        let code = user["referralCode"].as_str().unwrap().to_string();
        assert_eq!(code.len(), 6);

        let (status, _, body) = send(&app.router, get("/api/referral/link", Some(&cookie))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["link"], format!("https://moscow.life/?ref={}", code));

        let (_, _, page) = send(&app.router, get("/api/page", Some(&cookie))).await;
        assert_eq!(page["referralLink"], format!("https://moscow.life/?ref={}", code));
    }

    #[tokio::test]
    async fn test_referral_link_from_page_load() {
        let app = app();
        let (_, a) = sign_up(&app.router, "", "a@x.com", "A").await;
        let a_code = a["referralCode"].as_str().unwrap();

        let (_, b) = sign_up(&app.router, &format!("?ref={}", a_code), "b@x.com", "B").await;

        let b_id = PrincipalId::new(b["id"].as_str().unwrap()).unwrap();
        let profile = app
            .state
            .profiles
            .find_by_principal(&b_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.referred_by.unwrap().as_str(), a["id"].as_str().unwrap());
    }

    #[tokio::test]
    async fn test_empty_display_name_rejected() {
        let app = app();
        let (_, cookie, _) = send(&app.router, get("/api/page", None)).await;
        let (status, _, body) = send(
            &app.router,
            post(
                "/api/account/signup",
                cookie.as_deref(),
                json!({ "email": "a@x.com", "password": "secret1", "displayName": "" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Пожалуйста, введите ваше имя.");
    }

    #[tokio::test]
    async fn test_sign_out_then_link_unauthorized() {
        let app = app();
        let (cookie, _) = sign_up(&app.router, "", "anna@x.com", "Anna").await;

        let (status, _, _) = send(
            &app.router,
            post("/api/account/signout", Some(&cookie), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _, _) = send(&app.router, get("/api/referral/link", Some(&cookie))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, _, page) = send(&app.router, get("/api/page", Some(&cookie))).await;
        assert!(page["user"].is_null());
    }

    #[tokio::test]
    async fn test_provider_without_name_shows_placeholder() {
        let app = app();
        app.identities
            .add_federated_identity("github.com", "tok-c", Some("c@x.com"), None)
            .await;
        let (_, cookie, _) = send(&app.router, get("/api/page", None)).await;

        let (status, _, body) = send(
            &app.router,
            post(
                "/api/account/provider",
                cookie.as_deref(),
                json!({ "providerId": "github.com", "accessToken": "tok-c" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isNewAccount"], true);
        assert_eq!(body["user"]["referralCode"], "GENERATING...");
        assert_eq!(body["user"]["greetingName"], "c@x.com");

        let (status, _, _) = send(&app.router, get("/api/referral/link", cookie.as_deref())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_provider_requires_token() {
        let app = app();
        let (_, cookie, _) = send(&app.router, get("/api/page", None)).await;
        let (status, _, _) = send(
            &app.router,
            post(
                "/api/account/provider",
                cookie.as_deref(),
                json!({ "providerId": "google.com" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_provider_accepts_opaque_access_token() {
        let app = app();
        app.identities
            .add_federated_identity("facebook.com", "EAAB/x+y==", Some("f@x.com"), Some("Fedor"))
            .await;
        let (_, cookie, _) = send(&app.router, get("/api/page", None)).await;

        let (status, _, body) = send(
            &app.router,
            post(
                "/api/account/provider",
                cookie.as_deref(),
                json!({ "providerId": "facebook.com", "accessToken": "EAAB/x+y==" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["isNewAccount"], true);
        assert_eq!(body["user"]["displayName"], "Fedor");
        assert_eq!(body["user"]["referralCodeReady"], true);
    }
}
