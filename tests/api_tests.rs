use marketplace_api::{
    AppConfig, AppState, InMemoryRepository, MockStorageService, create_router,
    auth::{self, Role},
    models::{
        Account, AuthResponse, Category, ClosestProvider, Command, CommandStatus, NewAccount,
        PromoCode, RegisteredProvider, ServiceProvider, ServiceType, SpState, SpStatus,
        TokenResponse,
    },
    repository::Repository,
};
use reqwest::{
    StatusCode,
    multipart::{Form, Part},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub repo: Arc<InMemoryRepository>,
    pub storage: MockStorageService,
    pub config: AppConfig,
    pub client: reqwest::Client,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Creates an account with `role` directly in the repository and signs a token for it.
    async fn token_for(&self, role: Role) -> (Uuid, String) {
        let account = self
            .repo
            .create_account(NewAccount {
                email: format!("{}@example.dz", Uuid::new_v4().simple()),
                password_hash: auth::hash_password("password123").unwrap(),
                role,
            })
            .await
            .unwrap();
        let token = auth::issue_token(&self.config, account.id, vec![role]).unwrap();
        (account.id, token)
    }

    async fn validated_provider(&self, services: &[&str], location: Option<(f64, f64)>) -> (Uuid, String) {
        let sp = self
            .repo
            .insert_service_provider(ServiceProvider {
                id: Uuid::new_v4(),
                phone: format!("+213{:09}", rand_digits()),
                status: SpStatus::Validated,
                percent_to_pay: 10.0,
                services: services.iter().map(|s| s.to_string()).collect(),
                latitude: location.map(|l| l.0),
                longitude: location.map(|l| l.1),
                ..Default::default()
            })
            .await;
        let token = auth::issue_token(&self.config, sp.id, vec![Role::ServiceProvider]).unwrap();
        (sp.id, token)
    }
}

fn rand_digits() -> u32 {
    (Uuid::new_v4().as_u128() % 1_000_000_000) as u32
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let storage = MockStorageService::new();
    let config = AppConfig::default();

    let state = AppState {
        repo: repo.clone(),
        storage: Arc::new(storage.clone()),
        config: config.clone(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        storage,
        config,
        client: reqwest::Client::new(),
    }
}

fn png(name: &str) -> Part {
    Part::bytes(vec![0x89, b'P', b'N', b'G'])
        .file_name(name.to_string())
        .mime_str("image/png")
        .unwrap()
}

fn pdf(name: &str) -> Part {
    Part::bytes(b"%PDF-1.4".to_vec())
        .file_name(name.to_string())
        .mime_str("application/pdf")
        .unwrap()
}

/// The text fields of a registration, without documents or diploma metadata.
fn registration_fields(phone: &str, email: &str) -> Form {
    Form::new()
        .text("phone", phone.to_string())
        .text("firstname", "Amine")
        .text("lastname", "Benali")
        .text("gender", "male")
        .text("birthdate", "1990-04-12")
        .text("wilaya", "Alger")
        .text("commune", "Bab Ezzouar")
        .text("jobTitle", "Plumber")
        .text("email", email.to_string())
        .text("latitude", "36.7538")
        .text("longitude", "3.0588")
        .text("services", r#"["plumbing"]"#)
}

fn registration_form(phone: &str, email: &str) -> Form {
    registration_fields(phone, email)
        .text("types", r#"["licence"]"#)
        .text("descriptions", r#"["Licence en hydraulique"]"#)
        .part("picture", png("me.png"))
        .part("idCard", pdf("id.pdf"))
        .part("docs", pdf("licence.pdf"))
}

async fn error_of(response: reqwest::Response) -> String {
    let body: Value = response.json().await.unwrap();
    body["error"].as_str().unwrap_or_default().to_string()
}

// --- Health & docs ---

#[tokio::test]
async fn health_check_answers_ok() {
    let app = spawn_app().await;
    let response = app.client.get(app.url("/health")).send().await.expect("req fail");
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn openapi_document_lists_the_api() {
    let app = spawn_app().await;
    let doc: Value = app
        .client
        .get(app.url("/api-docs/openapi.json"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(doc["paths"]["/api/commands/{id}/status"].is_object());
    assert!(doc["paths"]["/api/serviceProviders/closest"].is_object());
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = spawn_app().await;
    let response = app.client.get(app.url("/health")).send().await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

// --- Auth ---

#[tokio::test]
async fn register_then_login() {
    let app = spawn_app().await;
    let credentials = json!({ "email": "client@example.dz", "password": "password123" });

    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&credentials)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let registered: AuthResponse = response.json().await.unwrap();
    assert_eq!(registered.account.role, Role::Client);

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&credentials)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let login: TokenResponse = response.json().await.unwrap();
    let claims = auth::decode_token(&app.config, &login.token).unwrap();
    assert_eq!(claims.sub, registered.account.id);

    let duplicate = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&credentials)
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = spawn_app().await;
    app.client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "email": "client@example.dz", "password": "password123" }))
        .send()
        .await
        .unwrap();

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": "client@example.dz", "password": "not-the-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(response).await, "Invalid email or password.");
}

#[tokio::test]
async fn only_admins_provision_accounts() {
    let app = spawn_app().await;
    let (_, admin) = app.token_for(Role::Admin).await;
    let (_, store) = app.token_for(Role::Store).await;
    let body = json!({ "email": "shop@example.dz", "password": "password123", "role": "store" });

    let forbidden = app
        .client
        .post(app.url("/api/auth/accounts"))
        .bearer_auth(&store)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let created = app
        .client
        .post(app.url("/api/auth/accounts"))
        .bearer_auth(&admin)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let account: Account = created.json().await.unwrap();
    assert_eq!(account.role, Role::Store);
}

// --- Request pipeline ---

#[tokio::test]
async fn guards_run_in_order() {
    let app = spawn_app().await;
    let (_, client) = app.token_for(Role::Client).await;
    let (_, store) = app.token_for(Role::Store).await;

    let anonymous = app
        .client
        .delete(app.url("/api/categories/not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let wrong_role = app
        .client
        .delete(app.url("/api/categories/not-a-uuid"))
        .bearer_auth(&client)
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_role.status(), StatusCode::FORBIDDEN);

    let bad_id = app
        .client
        .delete(app.url("/api/categories/not-a-uuid"))
        .bearer_auth(&store)
        .send()
        .await
        .unwrap();
    assert_eq!(bad_id.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(bad_id).await, "Invalid ID.");

    let missing = app
        .client
        .delete(app.url(&format!("/api/categories/{}", Uuid::new_v4())))
        .bearer_auth(&store)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        error_of(missing).await,
        "The category with the given ID was not found."
    );
}

#[tokio::test]
async fn missing_category_is_reported_before_the_upload_is_read() {
    let app = spawn_app().await;
    let (_, store) = app.token_for(Role::Store).await;

    // The form has no `image`, which would be a 400 if the body were read first.
    let response = app
        .client
        .put(app.url(&format!("/api/categories/{}/image", Uuid::new_v4())))
        .bearer_auth(&store)
        .multipart(Form::new().text("name", "ignored"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.storage.keys().is_empty());
}

// --- Categories ---

#[tokio::test]
async fn category_image_lifecycle() {
    let app = spawn_app().await;
    let (_, store) = app.token_for(Role::Store).await;

    let response = app
        .client
        .post(app.url("/api/categories"))
        .bearer_auth(&store)
        .multipart(
            Form::new()
                .text("name", "Plumbing")
                .text("description", "Pipes and leaks")
                .part("image", png("plumbing.png")),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let category: Category = response.json().await.unwrap();
    let first_image = category.image.clone().expect("image key");
    assert!(first_image.starts_with("categories/"));
    assert_eq!(app.storage.keys(), vec![first_image.clone()]);

    let response = app
        .client
        .put(app.url(&format!("/api/categories/{}/image", category.id)))
        .bearer_auth(&store)
        .multipart(Form::new().part("image", png("new.png")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Category = response.json().await.unwrap();
    let second_image = updated.image.expect("image key");
    assert_ne!(second_image, first_image);
    assert_eq!(app.storage.keys(), vec![second_image]);

    let response = app
        .client
        .delete(app.url(&format!("/api/categories/{}", category.id)))
        .bearer_auth(&store)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.storage.keys().is_empty());
}

#[tokio::test]
async fn category_image_must_be_an_image() {
    let app = spawn_app().await;
    let (_, store) = app.token_for(Role::Store).await;

    let response = app
        .client
        .post(app.url("/api/categories"))
        .bearer_auth(&store)
        .multipart(
            Form::new()
                .text("name", "Plumbing")
                .part("image", pdf("plumbing.pdf")),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.storage.keys().is_empty());
}

#[tokio::test]
async fn duplicate_category_names_conflict_and_leave_no_files() {
    let app = spawn_app().await;
    let (_, store) = app.token_for(Role::Store).await;

    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let response = app
            .client
            .post(app.url("/api/categories"))
            .bearer_auth(&store)
            .multipart(
                Form::new()
                    .text("name", "Electricity")
                    .part("image", png("e.png")),
            )
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), expected);
    }
    assert_eq!(app.storage.keys().len(), 1);
}

// --- Promo codes ---

#[tokio::test]
async fn promo_codes_are_public_to_read_and_unique() {
    let app = spawn_app().await;
    let (_, store) = app.token_for(Role::Store).await;
    let body = json!({ "code": "summer24", "discount": 15 });

    let response = app
        .client
        .post(app.url("/api/promoCodes"))
        .bearer_auth(&store)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let promo: PromoCode = response.json().await.unwrap();
    assert_eq!(promo.code, "SUMMER24");
    assert!(promo.active);

    let duplicate = app
        .client
        .post(app.url("/api/promoCodes"))
        .bearer_auth(&store)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let listed: Vec<PromoCode> = app
        .client
        .get(app.url("/api/promoCodes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    let deleted = app
        .client
        .delete(app.url(&format!("/api/promoCodes/{}", promo.id)))
        .bearer_auth(&store)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);
}

// --- Service types ---

#[tokio::test]
async fn promo_code_expiry_can_be_moved_and_removed() {
    let app = spawn_app().await;
    let (_, store) = app.token_for(Role::Store).await;
    let promo: PromoCode = app
        .client
        .post(app.url("/api/promoCodes"))
        .bearer_auth(&store)
        .json(&json!({ "code": "EID2024", "discount": 10, "expires_at": "2020-01-01T00:00:00Z" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(promo.expires_at.is_some());
    let url = app.url(&format!("/api/promoCodes/{}", promo.id));

    let untouched: PromoCode = app
        .client
        .put(&url)
        .bearer_auth(&store)
        .json(&json!({ "discount": 20 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(untouched.discount, 20);
    assert_eq!(untouched.expires_at, promo.expires_at);

    let cleared = app
        .client
        .put(&url)
        .bearer_auth(&store)
        .json(&json!({ "expires_at": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(cleared.status(), StatusCode::OK);
    let cleared: PromoCode = cleared.json().await.unwrap();
    assert!(cleared.expires_at.is_none());
    assert!(cleared.is_usable(chrono::Utc::now()));
}

#[tokio::test]
async fn services_are_added_to_and_removed_from_a_type() {
    let app = spawn_app().await;
    let (_, admin) = app.token_for(Role::Admin).await;

    let service_type: ServiceType = app
        .client
        .post(app.url("/api/serviceTypes"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Plumbing" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let response = app
        .client
        .post(app.url(&format!("/api/serviceTypes/{}", service_type.id)))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Leak repair", "price": 1500.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let with_service: ServiceType = response.json().await.unwrap();
    assert_eq!(with_service.services.len(), 1);
    let service_id = with_service.services[0].id;

    let unknown = app
        .client
        .delete(app.url(&format!(
            "/api/serviceTypes/{}/services/{}",
            service_type.id,
            Uuid::new_v4()
        )))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let response = app
        .client
        .delete(app.url(&format!(
            "/api/serviceTypes/{}/services/{}",
            service_type.id, service_id
        )))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let emptied: ServiceType = response.json().await.unwrap();
    assert!(emptied.services.is_empty());

    // Reads are public.
    let public = app
        .client
        .get(app.url(&format!("/api/serviceTypes/{}", service_type.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(public.status(), StatusCode::OK);
}

// --- Service providers ---

#[tokio::test]
async fn provider_registration_stores_documents_and_signs_in() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/serviceProviders/register"))
        .multipart(registration_form("+213555123456", "amine@example.dz"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let registered: RegisteredProvider = response.json().await.unwrap();
    let sp = registered.service_provider;
    assert_eq!(sp.status, SpStatus::NotValidated);
    assert_eq!(sp.diplomas.len(), 1);
    assert!(sp.picture.is_some() && sp.id_card.is_some());
    assert_eq!(app.storage.keys().len(), 3);

    let claims = auth::decode_token(&app.config, &registered.token).unwrap();
    assert_eq!(claims.roles, vec![Role::ServiceProvider]);

    let check: Value = app
        .client
        .post(app.url("/api/serviceProviders/verifyPhone"))
        .json(&json!({ "phone": "+213555123456" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(check["registered"], true);
}

#[tokio::test]
async fn rejected_registration_removes_its_files() {
    let app = spawn_app().await;
    app.client
        .post(app.url("/api/serviceProviders/register"))
        .multipart(registration_form("+213555123456", "amine@example.dz"))
        .send()
        .await
        .unwrap();
    let stored = app.storage.keys();

    let response = app
        .client
        .post(app.url("/api/serviceProviders/register"))
        .multipart(registration_form("+213555123456", "other@example.dz"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        error_of(response).await,
        "This phone number is already registered."
    );
    assert_eq!(app.storage.keys(), stored);
}

#[tokio::test]
async fn docs_must_match_their_types() {
    let app = spawn_app().await;
    let form = registration_form("+213555123456", "amine@example.dz").part("docs", pdf("extra.pdf"));

    let response = app
        .client
        .post(app.url("/api/serviceProviders/register"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.storage.keys().is_empty());
}

#[tokio::test]
async fn providers_need_validation_before_going_online() {
    let app = spawn_app().await;
    let (_, admin) = app.token_for(Role::Admin).await;
    let registered: RegisteredProvider = app
        .client
        .post(app.url("/api/serviceProviders/register"))
        .multipart(registration_form("+213555123456", "amine@example.dz"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = registered.service_provider.id;
    let state_url = app.url(&format!("/api/serviceProviders/{id}/state"));
    let body = json!({ "state": "emergency_ready" });

    let refused = app
        .client
        .put(&state_url)
        .bearer_auth(&registered.token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        error_of(refused).await,
        "Your account has not been validated yet."
    );

    let validated = app
        .client
        .put(app.url(&format!("/api/serviceProviders/{id}/validate")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(validated.status(), StatusCode::OK);

    let accepted = app
        .client
        .put(&state_url)
        .bearer_auth(&registered.token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), StatusCode::OK);

    let closest = app
        .client
        .post(app.url("/api/serviceProviders/closest"))
        .json(&json!({ "latitude": 36.7, "longitude": 3.1, "service": "plumbing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(closest.status(), StatusCode::OK);
    let closest: ClosestProvider = closest.json().await.unwrap();
    assert_eq!(closest.service_provider.id, id);
    assert!(closest.distance_km < 10.0);
}

#[tokio::test]
async fn closest_without_candidates_is_not_found() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(app.url("/api/serviceProviders/closest"))
        .json(&json!({ "latitude": 36.7, "longitude": 3.1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn providers_only_read_their_own_records() {
    let app = spawn_app().await;
    let (_, mine) = app.validated_provider(&["plumbing"], None).await;
    let (other_id, _) = app.validated_provider(&["plumbing"], None).await;

    let response = app
        .client
        .get(app.url(&format!("/api/serviceProviders/{other_id}/commands")))
        .bearer_auth(&mine)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn banned_providers_are_locked_out() {
    let app = spawn_app().await;
    let (_, admin) = app.token_for(Role::Admin).await;
    let (id, token) = app.validated_provider(&["plumbing"], None).await;

    let banned: ServiceProvider = app
        .client
        .put(app.url(&format!("/api/serviceProviders/{id}/ban")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(banned.status, SpStatus::Banned);

    let response = app
        .client
        .get(app.url("/api/serviceProviders/me/balance"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn registration_accepts_any_number_of_diplomas() {
    let app = spawn_app().await;
    let count = 11;
    let types = json!(vec!["professional"; count]).to_string();
    let descriptions = json!((0..count).map(|i| format!("Certificate {i}")).collect::<Vec<_>>())
        .to_string();
    let mut form = registration_fields("+213555123456", "amine@example.dz")
        .text("types", types)
        .text("descriptions", descriptions)
        .part("idCard", pdf("id.pdf"));
    for i in 0..count {
        form = form.part("docs", pdf(&format!("cert-{i}.pdf")));
    }

    let response = app
        .client
        .post(app.url("/api/serviceProviders/register"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let registered: RegisteredProvider = response.json().await.unwrap();
    assert_eq!(registered.service_provider.diplomas.len(), count);
    assert_eq!(
        registered.service_provider.diplomas[10].description.as_deref(),
        Some("Certificate 10")
    );
    assert_eq!(app.storage.keys().len(), count + 1);
}

#[tokio::test]
async fn providers_replace_only_their_own_services() {
    let app = spawn_app().await;
    let (_, admin) = app.token_for(Role::Admin).await;
    let (id, token) = app.validated_provider(&["plumbing"], None).await;
    let (_, other) = app.validated_provider(&["painting"], None).await;
    let url = app.url(&format!("/api/serviceProviders/{id}/services"));
    let body = json!({ "services": ["plumbing", "heating"] });

    let response = app
        .client
        .put(&url)
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let sp: ServiceProvider = response.json().await.unwrap();
    assert_eq!(sp.services, vec!["plumbing", "heating"]);

    for intruder in [&other, &admin] {
        let response = app
            .client
            .put(&url)
            .bearer_auth(intruder)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    let unknown = app
        .client
        .put(app.url(&format!("/api/serviceProviders/{}/services", Uuid::new_v4())))
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn new_profile_picture_replaces_the_stored_one() {
    let app = spawn_app().await;
    let registered: RegisteredProvider = app
        .client
        .post(app.url("/api/serviceProviders/register"))
        .multipart(registration_form("+213555123456", "amine@example.dz"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = registered.service_provider.id;
    let old_picture = registered.service_provider.picture.unwrap();
    let url = app.url(&format!("/api/serviceProviders/{id}/picture"));

    let rejected = app
        .client
        .put(&url)
        .bearer_auth(&registered.token)
        .multipart(Form::new().part("picture", pdf("me.pdf")))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    assert!(app.storage.keys().contains(&old_picture));

    let (_, other) = app.validated_provider(&["plumbing"], None).await;
    let forbidden = app
        .client
        .put(&url)
        .bearer_auth(&other)
        .multipart(Form::new().part("picture", png("me.png")))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let response = app
        .client
        .put(&url)
        .bearer_auth(&registered.token)
        .multipart(Form::new().part("picture", png("new.png")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let sp: ServiceProvider = response.json().await.unwrap();
    let new_picture = sp.picture.unwrap();

    assert_ne!(new_picture, old_picture);
    let keys = app.storage.keys();
    assert!(keys.contains(&new_picture));
    assert!(!keys.contains(&old_picture));
    assert_eq!(keys.len(), 3);
}

#[tokio::test]
async fn provider_listings_apply_their_filters() {
    let app = spawn_app().await;
    let (_, admin) = app.token_for(Role::Admin).await;
    let (_, client) = app.token_for(Role::Client).await;

    let mut ids = Vec::new();
    for (status, state, wilaya, service) in [
        (SpStatus::Validated, SpState::Ready, "Oran", "plumbing"),
        (SpStatus::Validated, SpState::Ready, "Alger", "plumbing"),
        (SpStatus::Validated, SpState::NotReady, "Oran", "plumbing"),
        (SpStatus::NotValidated, SpState::NotReady, "Oran", "plumbing"),
    ] {
        let sp = app
            .repo
            .insert_service_provider(ServiceProvider {
                id: Uuid::new_v4(),
                phone: format!("+213{:09}", rand_digits()),
                status,
                state,
                wilaya: wilaya.to_string(),
                services: vec![service.to_string()],
                ..Default::default()
            })
            .await;
        ids.push(sp.id);
    }

    let pending: Vec<ServiceProvider> = app
        .client
        .get(app.url("/api/serviceProviders?status=not_validated"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, ids[3]);

    let available: Vec<ServiceProvider> = app
        .client
        .get(app.url("/api/serviceProviders/available?wilaya=Oran&service=plumbing"))
        .bearer_auth(&client)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].id, ids[0]);

    let malformed = app
        .client
        .get(app.url("/api/serviceProviders?status=bogus"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    assert!(!error_of(malformed).await.is_empty());
}

// --- Commands ---

#[tokio::test]
async fn command_lifecycle_credits_the_provider() {
    let app = spawn_app().await;
    let (_, store) = app.token_for(Role::Store).await;
    let (_, client) = app.token_for(Role::Client).await;
    let (_, admin) = app.token_for(Role::Admin).await;
    let (sp_id, sp_token) = app.validated_provider(&["plumbing"], None).await;

    app.client
        .post(app.url("/api/promoCodes"))
        .bearer_auth(&store)
        .json(&json!({ "code": "WELCOME", "discount": 20 }))
        .send()
        .await
        .unwrap();

    let response = app
        .client
        .post(app.url("/api/commands"))
        .bearer_auth(&client)
        .json(&json!({
            "service_provider_id": sp_id,
            "type": "rent",
            "address": "12 rue Didouche Mourad, Alger",
            "price": 2000.0,
            "promo_code": "WELCOME"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let command: Command = response.json().await.unwrap();
    assert_eq!(command.status, CommandStatus::Pending);
    assert_eq!(command.total, 1600.0);

    // Clients may cancel but never complete.
    let status_url = app.url(&format!("/api/commands/{}/status", command.id));
    let refused = app
        .client
        .put(&status_url)
        .bearer_auth(&client)
        .json(&json!({ "status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);

    let done = app
        .client
        .put(&status_url)
        .bearer_auth(&sp_token)
        .json(&json!({ "status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(done.status(), StatusCode::OK);

    let again = app
        .client
        .put(&status_url)
        .bearer_auth(&admin)
        .json(&json!({ "status": "canceled" }))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let balance: Value = app
        .client
        .get(app.url("/api/serviceProviders/me/balance"))
        .bearer_auth(&sp_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(balance["balance"], 1600.0);
    assert_eq!(balance["amount_to_pay"], 160.0);

    let interventions: Vec<Value> = app
        .client
        .get(app.url(&format!("/api/serviceProviders/{sp_id}/interventions")))
        .bearer_auth(&sp_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(interventions.len(), 1);

    // A payment settles part of the commission.
    let response = app
        .client
        .post(app.url(&format!("/api/serviceProviders/{sp_id}/payments")))
        .bearer_auth(&admin)
        .json(&json!({ "amount": 100.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let sp = app.repo.get_service_provider(sp_id).await.unwrap().unwrap();
    assert_eq!(sp.amount_to_pay, 60.0);
}

#[tokio::test]
async fn unknown_promo_codes_are_rejected() {
    let app = spawn_app().await;
    let (_, client) = app.token_for(Role::Client).await;
    let (sp_id, _) = app.validated_provider(&["plumbing"], None).await;

    let response = app
        .client
        .post(app.url("/api/commands"))
        .bearer_auth(&client)
        .json(&json!({
            "service_provider_id": sp_id,
            "address": "Oran",
            "price": 500.0,
            "promo_code": "NOSUCHCODE"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(response).await, "Invalid or expired promo code.");
}

#[tokio::test]
async fn commands_are_scoped_to_their_parties() {
    let app = spawn_app().await;
    let (_, client) = app.token_for(Role::Client).await;
    let (_, stranger) = app.token_for(Role::Client).await;
    let (_, store) = app.token_for(Role::Store).await;
    let (sp_id, _) = app.validated_provider(&["plumbing"], None).await;

    let command: Command = app
        .client
        .post(app.url("/api/commands"))
        .bearer_auth(&client)
        .json(&json!({ "service_provider_id": sp_id, "address": "Oran", "price": 500.0 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let own: Vec<Command> = app
        .client
        .get(app.url("/api/commands"))
        .bearer_auth(&client)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(own.len(), 1);

    let hidden = app
        .client
        .get(app.url(&format!("/api/commands/{}", command.id)))
        .bearer_auth(&stranger)
        .send()
        .await
        .unwrap();
    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);

    let stores = app
        .client
        .get(app.url("/api/commands"))
        .bearer_auth(&store)
        .send()
        .await
        .unwrap();
    assert_eq!(stores.status(), StatusCode::FORBIDDEN);
}
