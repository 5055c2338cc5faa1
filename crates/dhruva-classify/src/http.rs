use crate::error::ClassifyError;
use crate::{Classifier, ClassifierOutput};
use dhruva_core::taxonomy::{Language, RootCause};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for the NLP service's `POST /api/nlp/classify`.
pub struct HttpClassifier {
    client: reqwest::blocking::Client,
    url: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
    language: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    department_name: Option<String>,
    #[serde(default)]
    root_cause: Option<String>,
    confidence: f64,
}

impl HttpClassifier {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ClassifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifyError::Http(format!("failed to build client: {}", e)))?;
        Ok(Self {
            client,
            url: format!("{}/api/nlp/classify", endpoint.trim_end_matches('/')),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn map_err(&self, e: reqwest::Error) -> ClassifyError {
        if e.is_timeout() {
            ClassifyError::Timeout(self.timeout.as_millis() as u64)
        } else {
            ClassifyError::Http(e.to_string())
        }
    }
}

impl Classifier for HttpClassifier {
    fn name(&self) -> &str {
        "http"
    }

    fn classify(&self, text: &str, language: Language) -> Result<ClassifierOutput, ClassifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&ClassifyRequest {
                text,
                language: language.code(),
            })
            .send()
            .map_err(|e| self.map_err(e))?;

        if !response.status().is_success() {
            return Err(ClassifyError::Http(format!(
                "service returned {}",
                response.status()
            )));
        }

        let body = response.text().map_err(|e| self.map_err(e))?;
        let parsed: ClassifyResponse = serde_json::from_str(&body)
            .map_err(|e| ClassifyError::InvalidResponse(e.to_string()))?;
        let root_cause = parsed
            .root_cause
            .ok_or_else(|| ClassifyError::InvalidResponse("missing root_cause".into()))?;
        let root_cause = RootCause::parse(&root_cause)
            .map_err(|e| ClassifyError::InvalidResponse(e.to_string()))?;

        Ok(ClassifierOutput {
            department: parsed.department.or(parsed.department_name),
            root_cause,
            confidence: parsed.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve one request with `body`, returning the request body seen.
    fn serve_once(status: &str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let status = status.to_string();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(v) = lower.strip_prefix("content-length:") {
                    content_length = v.trim().parse().unwrap();
                }
            }
            let mut request = vec![0; content_length];
            reader.read_exact(&mut request).unwrap();
            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            )
            .unwrap();
            String::from_utf8(request).unwrap()
        });
        (format!("http://{}", addr), handle)
    }

    #[test]
    fn posts_text_and_language() {
        let (endpoint, server) = serve_once(
            "200 OK",
            r#"{"department": "Pension", "root_cause": "MISSING_INFORMATION", "confidence": 0.82}"#,
        );
        let classifier = HttpClassifier::new(&endpoint, Duration::from_secs(5)).unwrap();
        let out = classifier
            .classify("పెన్షన్ రాలేదు", Language::Te)
            .unwrap();
        assert_eq!(out.department.as_deref(), Some("Pension"));
        assert_eq!(out.root_cause.as_str(), "MISSING_INFORMATION");
        assert_eq!(out.confidence, 0.82);

        let sent: serde_json::Value = serde_json::from_str(&server.join().unwrap()).unwrap();
        assert_eq!(sent["language"], "te");
        assert_eq!(sent["text"], "పెన్షన్ రాలేదు");
    }

    #[test]
    fn missing_root_cause_is_malformed() {
        let (endpoint, server) = serve_once("200 OK", r#"{"department_id": 3, "confidence": 0.9}"#);
        let classifier = HttpClassifier::new(&endpoint, Duration::from_secs(5)).unwrap();
        let err = classifier.classify("road broken", Language::En).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidResponse(_)));
        server.join().unwrap();
    }

    #[test]
    fn server_error_is_http_error() {
        let (endpoint, server) = serve_once("503 Service Unavailable", "{}");
        let classifier = HttpClassifier::new(&endpoint, Duration::from_secs(5)).unwrap();
        let err = classifier.classify("road broken", Language::En).unwrap_err();
        assert!(matches!(err, ClassifyError::Http(ref m) if m.contains("503")));
        server.join().unwrap();
    }

    #[test]
    fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let _server = thread::spawn(move || {
            let (_stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_secs(2));
        });
        let classifier = HttpClassifier::new(&endpoint, Duration::from_millis(200)).unwrap();
        let err = classifier.classify("road broken", Language::En).unwrap_err();
        assert!(matches!(err, ClassifyError::Timeout(200)));
    }

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let classifier =
            HttpClassifier::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(classifier.url(), "http://localhost:8000/api/nlp/classify");
    }
}
