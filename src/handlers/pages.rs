//! # Static Pages
//!
//! `GET /` serves the recorder page. The HTML is read from disk on every
//! request so it can be edited without restarting the server.

use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};

pub async fn index(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let path = state.get_config().server.index_page;

    let html = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| AppError::Internal(format!("failed to read index page {}: {}", path, e)))?;

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioNormalizer;
    use crate::config::AppConfig;
    use crate::dialogue::{ChatClient, SessionRegistry};
    use crate::pipeline::VoicePipeline;
    use crate::speech::{GoogleAuth, SynthesisClient, TranscriptionClient};
    use actix_web::{test, App};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_state(index_page: &str) -> AppState {
        let timeout = Duration::from_secs(5);
        let auth = GoogleAuth::from_static_token("test-token");
        let pipeline = VoicePipeline::new(
            AudioNormalizer::new(),
            TranscriptionClient::new(auth.clone(), "en-US".to_string(), timeout).unwrap(),
            ChatClient::new("test-key".to_string(), "gemini-1.5-flash".to_string(), timeout)
                .unwrap(),
            SynthesisClient::new(auth, "en-US".to_string(), "FEMALE".to_string(), timeout)
                .unwrap(),
            Arc::new(SessionRegistry::new(1800)),
        );
        let mut config = AppConfig::default();
        config.server.index_page = index_page.to_string();
        AppState::new(config, Arc::new(pipeline))
    }

    #[actix_web::test]
    async fn serves_page_from_disk() {
        let dir = std::env::temp_dir().join("chefbot-pages-test");
        std::fs::create_dir_all(&dir).unwrap();
        let page = dir.join("index.html");
        std::fs::write(&page, "<html><body>ChefBot</body></html>").unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(page.to_str().unwrap())))
                .route("/", web::get().to(index)),
        )
        .await;

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body = test::read_body(resp).await;
        assert!(std::str::from_utf8(&body).unwrap().contains("ChefBot"));
    }

    #[actix_web::test]
    async fn missing_page_is_a_server_error() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state("/nonexistent/index.html")))
                .route("/", web::get().to(index)),
        )
        .await;

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 500);
    }
}
