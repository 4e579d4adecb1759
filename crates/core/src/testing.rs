//! In-memory transport used by the orchestrator tests

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use crate::config::Endpoints;
use crate::credential::CachedCredential;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::traits::{DownloadResponse, JsonRequest, RawResponse, Transport, UploadForm};

pub(crate) const API: &str = "http://api.test/v6";
pub(crate) const FILES: &str = "http://files.test/f/";

/// A multipart form as the fake received it
#[derive(Debug, Clone)]
pub(crate) struct RecordedForm {
    pub url: String,
    pub fields: Vec<(String, String)>,
    pub field_name: String,
    pub file_name: String,
    pub content_type: String,
    pub length: u64,
    pub content: Vec<u8>,
}

type FormHandler = Arc<dyn Fn(&RecordedForm) -> RawResponse + Send + Sync>;

struct PlannedGet {
    status: u16,
    content_length: Option<u64>,
    chunks: Vec<std::result::Result<Bytes, String>>,
}

#[derive(Default)]
struct State {
    json_replies: HashMap<String, VecDeque<RawResponse>>,
    json_calls: Vec<JsonRequest>,
    form_handler: Option<FormHandler>,
    forms: Vec<RecordedForm>,
    gets: HashMap<String, PlannedGet>,
    get_calls: Vec<String>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeTransport {
    state: Arc<Mutex<State>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next call to an API operation
    pub fn on_json(&self, operation: &str, status: u16, body: serde_json::Value) -> &Self {
        self.on_json_raw(operation, status, body.to_string())
    }

    pub fn on_json_raw(&self, operation: &str, status: u16, body: impl Into<String>) -> &Self {
        let url = format!("{API}/{operation}");
        self.state
            .lock()
            .unwrap()
            .json_replies
            .entry(url)
            .or_default()
            .push_back(RawResponse {
                status,
                body: Bytes::from(body.into()),
            });
        self
    }

    pub fn on_form(
        &self,
        handler: impl Fn(&RecordedForm) -> RawResponse + Send + Sync + 'static,
    ) -> &Self {
        self.state.lock().unwrap().form_handler = Some(Arc::new(handler));
        self
    }

    pub fn on_get(
        &self,
        url: &str,
        status: u16,
        content_length: Option<u64>,
        chunks: Vec<std::result::Result<Bytes, String>>,
    ) -> &Self {
        self.state.lock().unwrap().gets.insert(
            url.to_string(),
            PlannedGet {
                status,
                content_length,
                chunks,
            },
        );
        self
    }

    pub fn json_calls(&self) -> Vec<JsonRequest> {
        self.state.lock().unwrap().json_calls.clone()
    }

    pub fn forms(&self) -> Vec<RecordedForm> {
        self.state.lock().unwrap().forms.clone()
    }

    pub fn get_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().get_calls.clone()
    }

    /// Session over this fake with a fixed credential
    pub fn session(&self) -> Session {
        Session::new(
            self.clone(),
            Endpoints::new(API, FILES),
            CachedCredential::fixed("sk_test"),
        )
    }
}

pub(crate) fn respond(status: u16, body: &str) -> RawResponse {
    RawResponse {
        status,
        body: Bytes::from(body.to_string()),
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn post_json(&self, request: JsonRequest) -> Result<RawResponse> {
        let mut state = self.state.lock().unwrap();
        let reply = state
            .json_replies
            .get_mut(&request.url)
            .and_then(|queue| queue.pop_front());
        state.json_calls.push(request);
        reply.ok_or_else(|| Error::Network("connection refused".into()))
    }

    async fn post_form(&self, url: &str, form: UploadForm) -> Result<RawResponse> {
        let chunks: Vec<Result<Bytes>> = form.file.body.collect().await;
        let mut content = Vec::new();
        for chunk in chunks {
            content.extend_from_slice(&chunk?);
        }

        let recorded = RecordedForm {
            url: url.to_string(),
            fields: form.fields,
            field_name: form.file.field_name,
            file_name: form.file.file_name,
            content_type: form.file.content_type,
            length: form.file.length,
            content,
        };

        let mut state = self.state.lock().unwrap();
        let response = match &state.form_handler {
            Some(handler) => handler(&recorded),
            None => respond(204, ""),
        };
        state.forms.push(recorded);
        Ok(response)
    }

    async fn get(&self, url: &str) -> Result<DownloadResponse> {
        let mut state = self.state.lock().unwrap();
        state.get_calls.push(url.to_string());
        let planned = state
            .gets
            .remove(url)
            .ok_or_else(|| Error::Network(format!("no route to {url}")))?;

        let items: Vec<Result<Bytes>> = planned
            .chunks
            .into_iter()
            .map(|c| c.map_err(Error::Network))
            .collect();

        Ok(DownloadResponse {
            status: planned.status,
            content_length: planned.content_length,
            body: Box::pin(futures::stream::iter(items)),
        })
    }
}
