// tests/ai_tests.rs

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use axum::{Json, Router, extract::State, routing::post};
use quizmania::{ai::llm::OllamaClient, config::Config, routes, state::AppState};
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;

const CHAT_ANSWER: &str = "Hi! Ask me to make a quiz whenever you are ready.";

/// Stand-in for Ollama's `/api/generate`: records prompts, answers quiz
/// prompts with fresh questions and everything else with a chat line.
#[derive(Clone, Default)]
struct FakeModel {
    prompts: Arc<Mutex<Vec<String>>>,
    served: Arc<AtomicUsize>,
}

impl FakeModel {
    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

fn requested_batch(prompt: &str) -> usize {
    prompt
        .split("EXACTLY ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(1)
}

async fn fake_generate(State(model): State<FakeModel>, Json(body): Json<Value>) -> Json<Value> {
    let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
    model.prompts.lock().unwrap().push(prompt.clone());

    if !prompt.contains("Quiz Generator") {
        return Json(json!({ "response": CHAT_ANSWER, "done": true }));
    }

    let questions: Vec<Value> = (0..requested_batch(&prompt))
        .map(|_| {
            let n = model.served.fetch_add(1, Ordering::SeqCst) + 1;
            json!({
                "question": format!("Which river is number {n} on the list?"),
                "options": {"1": "Nile", "2": "Amazon", "3": "Danube", "4": "Volga"},
                "answer": "B",
                "explanation": "It is the one on the list."
            })
        })
        .collect();

    // models like to wrap the array in prose
    let response = format!("Sure! {}", Value::Array(questions));
    Json(json!({ "response": response, "done": true }))
}

async fn spawn_fake_model() -> (url::Url, FakeModel) {
    let model = FakeModel::default();
    let app = Router::new()
        .route("/api/generate", post(fake_generate))
        .with_state(model.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let url = url::Url::parse(&format!("http://127.0.0.1:{}", port)).unwrap();
    (url, model)
}

async fn spawn_app() -> (String, FakeModel) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory sqlite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let (ollama_url, model) = spawn_fake_model().await;
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_ai_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        ollama_url: ollama_url.clone(),
        ollama_model: "fake".to_string(),
        tesseract_cmd: "tesseract".to_string(),
        ocr_timeout: Duration::from_secs(5),
    };

    let llm = OllamaClient::new(ollama_url, "fake");
    let app = routes::create_router(AppState::new(pool, config, Arc::new(llm)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://127.0.0.1:{}", port), model)
}

async fn login(client: &reqwest::Client, address: &str) -> String {
    let username = format!("maker_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let credentials = json!({"username": username, "password": "password123"});

    client
        .post(format!("{}/api/auth/register", address))
        .json(&credentials)
        .send()
        .await
        .unwrap();

    let login: Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&credentials)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    login["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn assistant_requires_login() {
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/ai/generate", address))
        .multipart(Form::new().text("user_input", "hello"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn empty_form_is_rejected() {
    let (address, model) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address).await;

    let response = client
        .post(format!("{}/api/ai/generate", address))
        .bearer_auth(&token)
        .multipart(Form::new().text("user_input", "   "))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    assert!(model.prompts().is_empty());
}

#[tokio::test]
async fn small_talk_gets_a_chat_reply() {
    let (address, model) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address).await;

    let reply: Value = client
        .post(format!("{}/api/ai/generate", address))
        .bearer_auth(&token)
        .multipart(Form::new().text("user_input", "  Good morning!  "))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(reply, json!({"type": "chat", "response": CHAT_ANSWER}));

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(r#"User said "good morning!""#));
}

#[tokio::test]
async fn count_in_the_message_wins_over_the_form() {
    let (address, model) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address).await;

    let generated: Value = client
        .post(format!("{}/api/ai/generate", address))
        .bearer_auth(&token)
        .multipart(
            Form::new()
                .text("user_input", "Generate 7 questions about rivers")
                .text("num_questions", "3"),
        )
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(generated["type"], "generate");
    assert_eq!(generated["num_questions"], 7);

    let questions = generated["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 7);
    assert_eq!(questions[0]["answer"], "2");
    assert_eq!(questions[0]["options"]["4"], "Volga");

    // batches of 5, then the remaining 2
    let prompts = model.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("EXACTLY 5"));
    assert!(prompts[1].contains("EXACTLY 2"));
    assert!(prompts[0].contains("USER INSTRUCTIONS/TOPIC:\nGenerate 7 questions about rivers"));
}

#[tokio::test]
async fn uploaded_document_always_generates() {
    let (address, model) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address).await;

    let document = Part::bytes(b"rivers flow downhill".to_vec())
        .file_name("notes.txt")
        .mime_str("text/plain")
        .unwrap();

    let generated: Value = client
        .post(format!("{}/api/ai/generate", address))
        .bearer_auth(&token)
        .multipart(
            Form::new()
                .text("user_input", "")
                .text("num_questions", "2")
                .part("document", document),
        )
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(generated["type"], "generate");
    assert_eq!(generated["questions"].as_array().unwrap().len(), 2);

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("TEXT TO ANALYZE:\nFilename: notes.txt"));
    assert!(!prompts[0].contains("USER INSTRUCTIONS/TOPIC"));
}

#[tokio::test]
async fn generated_questions_become_a_playable_quiz() {
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address).await;

    let generated: Value = client
        .post(format!("{}/api/ai/generate", address))
        .bearer_auth(&token)
        .multipart(Form::new().text("user_input", "make 2 questions on rivers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let draft: Value = client
        .post(format!("{}/api/ai/review", address))
        .bearer_auth(&token)
        .json(&json!({"title": "  ", "questions": generated["questions"]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(draft["title"], "Generated Quiz");
    assert_eq!(draft["questions"].as_array().unwrap().len(), 2);
    assert_eq!(draft["questions"][0]["id"], 1);
    assert_eq!(draft["questions"][0]["marks"], 10);
    assert_eq!(draft["questions"][0]["correct_option"], 2);
    assert_eq!(
        draft["questions"][0]["options"],
        json!(["Nile", "Amazon", "Danube", "Volga"])
    );

    // the draft posts straight into quiz creation
    let created = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&draft)
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);
    let created: Value = created.json().await.unwrap();

    let dashboard: Value = client
        .get(format!("{}/api/quizzes/{}", address, created["code"].as_str().unwrap()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let first = &dashboard["questions"][0];
    assert_eq!(first["explanation"], "It is the one on the list.");
    assert_eq!(first["choices"][1]["text"], "Amazon");
    assert_eq!(first["choices"][1]["is_correct"], true);
}
