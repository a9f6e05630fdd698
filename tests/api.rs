use std::sync::Arc;

use actix_web::{
    http::{header, StatusCode},
    test, App,
};
use serde_json::{json, Value};
use uuid::Uuid;

use linkoja::clock::SystemClock;
use linkoja::config::JwtConfig;
use linkoja::models::UserRole;
use linkoja::security::{BcryptHasher, JwtService};
use linkoja::services::{Collaborators, Services};
use linkoja::store::Store;
use linkoja::testing::{seed_user, MemoryStore, RecordingMailer, RecordingSms, StubGoogleVerifier};

struct Harness {
    store: Arc<MemoryStore>,
    jwt: JwtService,
    services: Services,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::default());
    let jwt = JwtService::new(&JwtConfig {
        secret: "integration-secret".into(),
        issuer: "linkoja".into(),
        audience: "linkoja-clients".into(),
        expiry_minutes: 60,
    });
    let services = Services::new(Collaborators {
        store: store.clone(),
        hasher: Arc::new(BcryptHasher::new(4)),
        jwt: jwt.clone(),
        google: Arc::new(StubGoogleVerifier::rejecting()),
        sms: Arc::new(RecordingSms::default()),
        email: Arc::new(RecordingMailer::default()),
        clock: Arc::new(SystemClock),
    });
    Harness { store, jwt, services }
}

async fn admin_token(h: &Harness) -> String {
    let admin = seed_user(&h.store, "admin@linkoja.com", Some("Admin")).await.unwrap();
    h.store.set_role(admin.id, UserRole::Admin);
    let admin = h.store.find_user_by_id(admin.id).await.unwrap().unwrap();
    h.jwt.issue(&admin).unwrap()
}

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

#[actix_rt::test]
async fn registered_owner_sees_approval_end_to_end() {
    let h = harness();
    let app = test::init_service(App::new().configure(linkoja::configure(h.services.clone()))).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "email": "a@x.com", "password": "secret1", "name": "Alice" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["isSuccessful"], true);
    assert_eq!(body["response"]["code"], "00");
    assert!(body["response"]["data"]["user"].get("passwordHash").is_none());
    let owner_token = body["response"]["data"]["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/business")
        .insert_header(bearer(&owner_token))
        .set_json(json!({ "name": "Joe's Cafe", "category": "food" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["response"]["data"]["status"], "pending");
    let business_id = body["response"]["data"]["id"].as_str().unwrap().to_string();

    // Pending businesses stay out of the public listing.
    let req = test::TestRequest::get().uri("/api/business").to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["response"]["data"].as_array().unwrap().len(), 0);

    let admin = admin_token(&h).await;
    let req = test::TestRequest::post()
        .uri(&format!("/api/admin/businesses/{business_id}/approve"))
        .insert_header(bearer(&admin))
        .set_json(json!({ "status": "verified" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/business/{business_id}"))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["response"]["data"]["status"], "verified");
    assert_eq!(body["response"]["data"]["ownerName"], "Alice");

    let req = test::TestRequest::get()
        .uri("/api/notification?unreadOnly=true")
        .insert_header(bearer(&owner_token))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let notes = body["response"]["data"].as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["type"], "approval");
    assert_eq!(notes[0]["isRead"], false);
    assert_eq!(notes[0]["relatedBusinessName"], "Joe's Cafe");

    let req = test::TestRequest::get()
        .uri("/api/notification/unread-count")
        .insert_header(bearer(&owner_token))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["response"]["data"]["count"], 1);
}

#[actix_rt::test]
async fn authorization_failures_use_the_envelope() {
    let h = harness();
    let app = test::init_service(App::new().configure(linkoja::configure(h.services.clone()))).await;

    let req = test::TestRequest::post()
        .uri("/api/business")
        .set_json(json!({ "name": "Joe's Cafe" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["isSuccessful"], false);
    assert_eq!(body["response"]["code"], "02");

    let user = seed_user(&h.store, "user@x.com", None).await.unwrap();
    let token = h.jwt.issue(&user).unwrap();
    let req = test::TestRequest::get()
        .uri("/api/admin/analytics")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["response"]["code"], "03");

    let req = test::TestRequest::get()
        .uri("/api/notification")
        .insert_header(bearer("not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn malformed_input_and_missing_rows_map_to_codes() {
    let h = harness();
    let app = test::init_service(App::new().configure(linkoja::configure(h.services.clone()))).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/business/{}", Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["response"]["code"], "04");

    let req = test::TestRequest::get().uri("/api/business/not-a-uuid").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["response"]["code"], "01");

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["response"]["code"], "01");

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "email": "not-an-email", "password": "secret1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["response"]["description"]
        .as_str()
        .unwrap()
        .starts_with("Validation failed"));
}

#[actix_rt::test]
async fn login_failures_do_not_reveal_which_part_was_wrong() {
    let h = harness();
    let app = test::init_service(App::new().configure(linkoja::configure(h.services.clone()))).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "email": "a@x.com", "password": "secret1" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "email": "A@X.com", "password": "secret2" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let mut descriptions = Vec::new();
    for (email, password) in [("a@x.com", "wrong-password"), ("nobody@x.com", "secret1")] {
        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": email, "password": password }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        descriptions.push(body["response"]["description"].clone());
    }
    assert_eq!(descriptions[0], descriptions[1]);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "a@x.com", "password": "secret1" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn forgot_password_answers_the_same_for_unknown_addresses() {
    let h = harness();
    let app = test::init_service(App::new().configure(linkoja::configure(h.services.clone()))).await;
    seed_user(&h.store, "known@x.com", None).await.unwrap();

    let mut bodies = Vec::new();
    for email in ["known@x.com", "unknown@x.com"] {
        let req = test::TestRequest::post()
            .uri("/api/auth/forgot-password")
            .set_json(json!({ "email": email }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        bodies.push(test::read_body_json::<Value, _>(resp).await);
    }
    assert_eq!(bodies[0], bodies[1]);
    assert!(bodies[0]["response"]["data"].is_null());
    assert_eq!(h.store.reset_tokens().len(), 1);
}

#[actix_rt::test]
async fn following_twice_is_a_no_op() {
    let h = harness();
    let app = test::init_service(App::new().configure(linkoja::configure(h.services.clone()))).await;

    let owner = seed_user(&h.store, "owner@x.com", None).await.unwrap();
    let fan = seed_user(&h.store, "fan@x.com", Some("Fan")).await.unwrap();
    let business = h
        .services
        .businesses
        .create_business(
            owner.id,
            serde_json::from_value(json!({ "name": "Joe's Cafe" })).unwrap(),
        )
        .await
        .unwrap();
    let token = h.jwt.issue(&fan).unwrap();
    let uri = format!("/api/business/{}/follow", business.id);

    let mut changes = Vec::new();
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri(&uri)
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["response"]["data"]["isFollowing"], true);
        changes.push(body["response"]["data"]["changed"].clone());
    }
    assert_eq!(changes, vec![json!(true), json!(false)]);

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["response"]["data"]["changed"], true);

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["response"]["data"]["changed"], false);
}

#[actix_rt::test]
async fn marking_someone_elses_notification_is_not_found() {
    let h = harness();
    let app = test::init_service(App::new().configure(linkoja::configure(h.services.clone()))).await;
    let user = seed_user(&h.store, "user@x.com", None).await.unwrap();
    let token = h.jwt.issue(&user).unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/api/notification/{}/read", Uuid::new_v4()))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::put()
        .uri("/api/notification/read-all")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn blank_business_fields_are_treated_as_absent() {
    let h = harness();
    let app = test::init_service(App::new().configure(linkoja::configure(h.services.clone()))).await;

    let owner = seed_user(&h.store, "owner@x.com", None).await.unwrap();
    let token = h.jwt.issue(&owner).unwrap();

    let req = test::TestRequest::post()
        .uri("/api/business")
        .insert_header(bearer(&token))
        .set_json(json!({ "name": "   " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["response"]["code"], "01");

    let req = test::TestRequest::post()
        .uri("/api/business")
        .insert_header(bearer(&token))
        .set_json(json!({ "name": "Joe's Cafe", "email": "", "description": "Old" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let business_id = body["response"]["data"]["id"].as_str().unwrap().to_string();
    assert!(body["response"]["data"]["email"].is_null());

    let req = test::TestRequest::put()
        .uri(&format!("/api/business/{business_id}"))
        .insert_header(bearer(&token))
        .set_json(json!({ "email": "joe@cafe.example" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::put()
        .uri(&format!("/api/business/{business_id}"))
        .insert_header(bearer(&token))
        .set_json(json!({ "description": "New", "email": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["response"]["data"]["description"], "New");
    assert_eq!(body["response"]["data"]["email"], "joe@cafe.example");

    let req = test::TestRequest::put()
        .uri(&format!("/api/business/{business_id}"))
        .insert_header(bearer(&token))
        .set_json(json!({ "email": "not-an-address" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn health_is_public() {
    let h = harness();
    let app = test::init_service(App::new().configure(linkoja::configure(h.services.clone()))).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}
