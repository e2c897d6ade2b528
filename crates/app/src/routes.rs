use crate::error::AppError;
use crate::render::{render_page, PageView, QUESTION_MAX_CHARS};
use crate::storage::FileStorage;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use pdf_chat_core::{ChatRequest, ChatResponse, ChatService, SessionId, UploadedDocument};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const SESSION_COOKIE: &str = "pdfchat_session";

pub struct AppState {
    pub service: ChatService,
    pub storage: Arc<dyn FileStorage>,
}

pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index).post(submit))
        .route("/health", get(health))
        // enforced while the multipart body is read, so the page can explain it
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn index() -> Html<String> {
    Html(render_page(&PageView::default()))
}

#[derive(Debug, Default)]
struct SubmittedForm {
    files: Vec<(String, Vec<u8>)>,
    question: Option<String>,
}

async fn submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    multipart: Multipart,
) -> Response {
    let (jar, session_id) = resolve_session(jar);

    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(error) => return error_page(jar, &error, None),
    };

    match process(&state, session_id, &form).await {
        Ok(response) => {
            let view = PageView {
                question: form.question.as_deref(),
                uploaded: response.uploaded,
                chat_history: response.chat_history.as_ref(),
                error: None,
            };
            (jar, Html(render_page(&view))).into_response()
        }
        Err(error) => error_page(jar, &error, form.question.as_deref()),
    }
}

async fn process(
    state: &AppState,
    session_id: SessionId,
    form: &SubmittedForm,
) -> Result<ChatResponse, AppError> {
    let mut documents = Vec::with_capacity(form.files.len());
    for (file_name, data) in &form.files {
        let stored = state.storage.save(file_name, data).await?;
        debug!(
            file_name = %stored.file_name,
            bytes = stored.size,
            path = %stored.path.display(),
            "stored upload"
        );
        let bytes = state.storage.open(&stored).await?;
        documents.push(UploadedDocument::new(stored.file_name, bytes));
    }

    if !documents.is_empty() {
        info!(session = %session_id, files = documents.len(), "received pdf upload");
    }

    let response = state
        .service
        .handle(
            session_id,
            ChatRequest {
                documents,
                question: form.question.clone(),
            },
        )
        .await?;

    Ok(response)
}

async fn read_form(mut multipart: Multipart) -> Result<SubmittedForm, AppError> {
    let mut form = SubmittedForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "pdf_files" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(multipart_error)?;

                // browsers send an empty part when no file was picked
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                form.files.push((file_name, data.to_vec()));
            }
            "question" => {
                let question = field
                    .text()
                    .await
                    .map_err(multipart_error)?;
                if question.chars().count() > QUESTION_MAX_CHARS {
                    return Err(AppError::Form(format!(
                        "the question must be at most {QUESTION_MAX_CHARS} characters"
                    )));
                }
                form.question = Some(question);
            }
            _ => {}
        }
    }

    Ok(form)
}

fn multipart_error(error: MultipartError) -> AppError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::UploadTooLarge
    } else {
        AppError::Form(error.body_text())
    }
}

fn resolve_session(jar: CookieJar) -> (CookieJar, SessionId) {
    let existing = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse::<SessionId>().ok());

    match existing {
        Some(id) => (jar, id),
        None => {
            let id = SessionId::new();
            let cookie = Cookie::build((SESSION_COOKIE, id.to_string()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax);
            (jar.add(cookie), id)
        }
    }
}

fn error_page(jar: CookieJar, error: &AppError, question: Option<&str>) -> Response {
    let status = error.status();
    if status == StatusCode::INTERNAL_SERVER_ERROR || status == StatusCode::BAD_GATEWAY {
        warn!(%status, error = %error, "request failed");
    } else {
        info!(%status, error = %error, "request rejected");
    }

    let view = PageView {
        question,
        error: Some(error.user_message()),
        ..PageView::default()
    };
    (status, jar, Html(render_page(&view))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalFileStorage;
    use ammonia::clean_text;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use pdf_chat_core::{
        CharacterNgramEmbedder, DocumentPipeline, IngestError, LanguageModel, PdfExtractor,
        ServiceError, SessionStore,
    };
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "pdfchat-test-boundary";

    struct Utf8Extractor;

    impl PdfExtractor for Utf8Extractor {
        fn extract_text(&self, document: &UploadedDocument) -> Result<String, IngestError> {
            String::from_utf8(document.bytes.clone()).map_err(|error| IngestError::PdfParse {
                file_name: document.file_name.clone(),
                details: error.to_string(),
            })
        }
    }

    struct FixedModel;

    #[async_trait]
    impl LanguageModel for FixedModel {
        async fn generate(&self, _prompt: &str) -> Result<String, ServiceError> {
            Ok("Cats are mammals.".to_string())
        }
    }

    fn app() -> (Router, TempDir) {
        app_with_limit(1024 * 1024)
    }

    fn app_with_limit(max_upload_bytes: usize) -> (Router, TempDir) {
        let dir = tempfile::tempdir().expect("temp dir");
        let pipeline = DocumentPipeline::new(
            Arc::new(Utf8Extractor),
            Arc::new(CharacterNgramEmbedder::default()),
            Arc::new(FixedModel),
        );
        let state = Arc::new(AppState {
            service: ChatService::new(pipeline, SessionStore::default()),
            storage: Arc::new(LocalFileStorage::new(dir.path())),
        });
        (router(state, max_upload_bytes), dir)
    }

    enum Part<'a> {
        File(&'a str, &'a [u8]),
        Text(&'a str, &'a str),
    }

    fn multipart_request(parts: &[Part<'_>], cookie: Option<&str>) -> Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::File(name, data) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"pdf_files\"; filename=\"{name}\"\r\n\
                             Content-Type: application/pdf\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                            .as_bytes(),
                    );
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method("POST")
            .uri("/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body)).expect("request builds")
    }

    fn session_cookie(response: &Response) -> Option<String> {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(str::to_string)
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body is readable");
        String::from_utf8(bytes.to_vec()).expect("body is utf-8")
    }

    #[tokio::test]
    async fn get_renders_the_form() {
        let (app, _dir) = app();
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).expect("request builds"))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("name=\"pdf_files\""));
    }

    #[tokio::test]
    async fn upload_and_ask_renders_history() {
        let (app, _dir) = app();
        let request = multipart_request(
            &[
                Part::File("animals.pdf", b"Cats are mammals.\nDogs are mammals too."),
                Part::Text("question", "What are cats?"),
            ],
            None,
        );

        let response = app.oneshot(request).await.expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response).expect("session cookie is set");
        assert!(cookie.starts_with(SESSION_COOKIE));

        let html = body_text(response).await;
        assert!(html.contains("chat-history"));
        assert!(html.contains(&clean_text("What are cats?")));
        assert!(html.contains(&clean_text("Cats are mammals.")));
    }

    #[tokio::test]
    async fn question_before_upload_shows_a_message() {
        let (app, _dir) = app();
        let request = multipart_request(&[Part::Text("question", "What are cats?")], None);

        let response = app.oneshot(request).await.expect("router responds");

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let html = body_text(response).await;
        assert!(html.contains(&clean_text(
            "Upload at least one PDF before asking a question."
        )));
    }

    #[tokio::test]
    async fn session_cookie_carries_the_conversation() {
        let (app, _dir) = app();

        let upload = multipart_request(
            &[Part::File("animals.pdf", b"Cats are mammals.")],
            None,
        );
        let response = app.clone().oneshot(upload).await.expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response).expect("session cookie is set");
        assert!(body_text(response).await.contains("upload-summary"));

        for _ in 0..2 {
            let ask = multipart_request(
                &[Part::Text("question", "What are cats?")],
                Some(&cookie),
            );
            let response = app.clone().oneshot(ask).await.expect("router responds");
            assert_eq!(response.status(), StatusCode::OK);
            assert!(session_cookie(&response).is_none());
        }

        let ask = multipart_request(&[Part::Text("question", "Again?")], Some(&cookie));
        let html = body_text(app.oneshot(ask).await.expect("router responds")).await;
        assert_eq!(html.matches("<li>").count(), 3);
    }

    #[tokio::test]
    async fn overlong_question_is_rejected() {
        let (app, _dir) = app();
        let question = "q".repeat(QUESTION_MAX_CHARS + 1);
        let request = multipart_request(&[Part::Text("question", &question)], None);

        let response = app.oneshot(request).await.expect("router responds");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unreadable_upload_is_reported() {
        let (app, _dir) = app();
        let request = multipart_request(&[Part::File("broken.pdf", &[0xff, 0xfe, 0x00])], None);

        let response = app.oneshot(request).await.expect("router responds");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response).await;
        assert!(html.contains(&clean_text("not a readable PDF")));
    }

    #[tokio::test]
    async fn oversized_upload_renders_the_form_with_a_message() {
        let (app, _dir) = app_with_limit(256);
        let large = vec![b'x'; 4096];
        let request = multipart_request(&[Part::File("large.pdf", &large)], None);

        let response = app.oneshot(request).await.expect("router responds");

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let html = body_text(response).await;
        assert!(html.contains("name=\"pdf_files\""));
        assert!(html.contains(&clean_text(&AppError::UploadTooLarge.user_message())));
    }

    #[tokio::test]
    async fn empty_file_part_is_ignored() {
        let (app, _dir) = app();
        let request = multipart_request(&[Part::File("", b"")], None);

        let response = app.oneshot(request).await.expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!body_text(response).await.contains("upload-summary"));
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (app, _dir) = app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).expect("request builds"))
            .await
            .expect("router responds");
        assert_eq!(body_text(response).await, "ok");
    }
}
