mod common;

use common::{response, serve};
use mimicnet::marshal::{AddCookiesInput, CookieJson, DestroySessionInput, GetCookiesInput};
use mimicnet::{Engine, NetError, RequestInput};
use std::sync::Arc;

fn cookie(name: &str, value: &str) -> CookieJson {
    CookieJson {
        name: name.into(),
        value: value.into(),
        ..Default::default()
    }
}

fn cookies_of(engine: &Engine, session: &str, url: &str) -> Vec<CookieJson> {
    engine
        .cookies_for(&GetCookiesInput { session_id: session.into(), url: url.into() })
        .unwrap()
        .cookies
}

#[test]
fn test_sessions_are_isolated() {
    let engine = Engine::new();
    engine
        .add_cookies(&AddCookiesInput {
            session_id: "a".into(),
            url: "https://example.test/".into(),
            cookies: vec![cookie("token", "secret")],
        })
        .unwrap();

    assert_eq!(cookies_of(&engine, "a", "https://example.test/").len(), 1);
    assert!(cookies_of(&engine, "b", "https://example.test/").is_empty());
    assert!(cookies_of(&engine, "a", "https://other.test/").is_empty());
}

#[test]
fn test_destroy_session_forgets_state() {
    let engine = Engine::new();
    let url = "https://example.test/";
    engine
        .add_cookies(&AddCookiesInput {
            session_id: "gone".into(),
            url: url.into(),
            cookies: vec![cookie("a", "1")],
        })
        .unwrap();

    let out = engine
        .destroy_session(&DestroySessionInput { session_id: "gone".into() })
        .unwrap();
    assert!(out.success);
    assert!(cookies_of(&engine, "gone", url).is_empty());
}

#[test]
fn test_destroy_all_is_idempotent() {
    let engine = Engine::new();
    for id in ["x", "y", "z"] {
        engine.sessions().get_or_create(id);
    }
    assert_eq!(engine.sessions().len(), 3);

    let first = engine.destroy_all().unwrap();
    let second = engine.destroy_all().unwrap();
    assert!(first.success && second.success);
    assert_ne!(first.id, second.id);
    assert!(engine.sessions().is_empty());
}

#[test]
fn test_double_release() {
    let engine = Engine::new();
    let out = engine.destroy_all().unwrap();

    assert!(engine.registry().contains(&out.id));
    engine.release(&out.id).unwrap();
    assert_eq!(
        engine.release(&out.id),
        Err(NetError::HandleNotFound(out.id.clone()))
    );
}

#[test]
fn test_expired_cookie_removes_existing() {
    let engine = Engine::new();
    let add = |c: CookieJson| {
        engine
            .add_cookies(&AddCookiesInput {
                session_id: "exp".into(),
                url: "https://example.test/".into(),
                cookies: vec![c],
            })
            .unwrap()
    };
    add(cookie("a", "1"));
    let out = add(CookieJson { max_age: -1, ..cookie("a", "") });
    assert!(out.cookies.is_empty());
}

#[tokio::test]
async fn test_concurrent_requests_share_session() {
    let server = serve(|req| {
        let n = req.path().trim_start_matches('/').to_string();
        response("200 OK", &[&format!("Set-Cookie: c{}=v; Path=/", n)], b"")
    })
    .await;
    let engine = Arc::new(Engine::new());

    let mut tasks = Vec::new();
    for i in 0..8 {
        let engine = engine.clone();
        let url = server.url(&format!("/{}", i));
        tasks.push(tokio::spawn(async move {
            engine
                .request(RequestInput {
                    session_id: Some("shared".into()),
                    request_url: url,
                    request_method: "GET".into(),
                    ..Default::default()
                })
                .await
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().status, 200);
    }

    assert_eq!(cookies_of(&engine, "shared", &server.url("/")).len(), 8);
    assert_eq!(engine.sessions().len(), 1);
}
