//! Client for the EMBOSS pairwise alignment job dispatcher.
//!
//! `POST {base}/{tool}/run` returns a job id, `GET {base}/{tool}/status/{id}`
//! is polled until `FINISHED`, then `GET {base}/{tool}/result/{id}/aln`
//! returns the pair text. Polling is capped at `max_poll_attempts`.

use crate::config::RemoteSettings;
use crate::error::{CrosswalkError, ErrorCode};
use crate::pair_format::parse_pair_alignment;
use crosswalk_protocol::{Alignment, AlignmentAlgorithm, FIRST_SEQUENCE_ID, SECOND_SEQUENCE_ID};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// HTTP seam used by [`RemoteAlignmentClient`].
pub trait JobTransport: Send + Sync {
    fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<String, CrosswalkError>;
    fn get_text(&self, url: &str) -> Result<String, CrosswalkError>;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> Result<Self, CrosswalkError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                CrosswalkError::new(
                    ErrorCode::Internal,
                    format!("could not build alignment service client: {e}"),
                )
            })?;
        Ok(Self { client })
    }

    fn read_body(
        url: &str,
        response: reqwest::Result<reqwest::blocking::Response>,
    ) -> Result<String, CrosswalkError> {
        let response = response.map_err(|e| classify_request_error(url, e))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| CrosswalkError::remote(format!("could not read response from '{url}': {e}")))?;
        if !status.is_success() {
            return Err(CrosswalkError::remote(format!(
                "HTTP {status} from '{url}': {}",
                body.trim()
            )));
        }
        Ok(body)
    }
}

fn classify_request_error(url: &str, e: reqwest::Error) -> CrosswalkError {
    let code = if e.is_timeout() {
        ErrorCode::Timeout
    } else {
        ErrorCode::Remote
    };
    CrosswalkError::new(code, format!("request to '{url}' failed: {e}"))
}

impl JobTransport for HttpTransport {
    fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<String, CrosswalkError> {
        Self::read_body(url, self.client.post(url).form(form).send())
    }

    fn get_text(&self, url: &str) -> Result<String, CrosswalkError> {
        Self::read_body(url, self.client.get(url).header("Accept", "text/plain").send())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    Running,
    Finished,
    Failed(String),
}

impl JobStatus {
    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_uppercase().as_str() {
            "QUEUED" | "PENDING" => JobStatus::Queued,
            "RUNNING" => JobStatus::Running,
            "FINISHED" => JobStatus::Finished,
            _ => JobStatus::Failed(text.trim().to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Failed(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentProgress {
    pub job_id: String,
    pub attempt: usize,
    pub status: Option<String>,
    pub message: String,
}

pub fn tool_id(algorithm: AlignmentAlgorithm) -> Option<&'static str> {
    match algorithm {
        AlignmentAlgorithm::Needle => Some("emboss_needle"),
        AlignmentAlgorithm::Water => Some("emboss_water"),
        AlignmentAlgorithm::Matcher => Some("emboss_matcher"),
        _ => None,
    }
}

pub struct RemoteAlignmentClient {
    transport: Arc<dyn JobTransport>,
    settings: RemoteSettings,
    tool: &'static str,
}

impl RemoteAlignmentClient {
    pub fn new(
        transport: Arc<dyn JobTransport>,
        algorithm: AlignmentAlgorithm,
        settings: RemoteSettings,
    ) -> Result<Self, CrosswalkError> {
        let tool = tool_id(algorithm).ok_or_else(|| {
            CrosswalkError::new(
                ErrorCode::Unsupported,
                format!("'{algorithm}' is not served by the remote alignment service"),
            )
        })?;
        Ok(Self {
            transport,
            settings,
            tool,
        })
    }

    fn url(&self, tail: &str) -> String {
        format!(
            "{}/{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            self.tool,
            tail
        )
    }

    pub fn submit(&self, seq1: &str, seq2: &str) -> Result<String, CrosswalkError> {
        let form = [
            ("email", self.settings.email.clone()),
            ("stype", "protein".to_string()),
            ("format", "pair".to_string()),
            ("asequence", format!(">{FIRST_SEQUENCE_ID}\n{seq1}\n")),
            ("bsequence", format!(">{SECOND_SEQUENCE_ID}\n{seq2}\n")),
        ];
        let job_id = self.transport.post_form(&self.url("run"), &form)?;
        let job_id = job_id.trim();
        if job_id.is_empty() || job_id.contains(char::is_whitespace) {
            return Err(CrosswalkError::malformed_result(format!(
                "Alignment service returned an unusable job id '{job_id}'"
            )));
        }
        log::info!("submitted {} job {job_id}", self.tool);
        Ok(job_id.to_string())
    }

    pub fn poll_status(&self, job_id: &str) -> Result<JobStatus, CrosswalkError> {
        let text = self.transport.get_text(&self.url(&format!("status/{job_id}")))?;
        Ok(JobStatus::parse(&text))
    }

    pub fn fetch_result(&self, job_id: &str) -> Result<String, CrosswalkError> {
        self.transport
            .get_text(&self.url(&format!("result/{job_id}/aln")))
    }

    /// Submits, polls until a terminal status and parses the result.
    /// `is_current` is consulted before every poll and countdown tick; once it
    /// returns false the job is abandoned with `ErrorCode::Superseded`.
    pub fn run(
        &self,
        seq1: &str,
        seq2: &str,
        is_current: &dyn Fn() -> bool,
        on_progress: &mut dyn FnMut(AlignmentProgress),
    ) -> Result<Alignment, CrosswalkError> {
        let job_id = self.submit(seq1, seq2)?;
        let superseded = || {
            CrosswalkError::new(
                ErrorCode::Superseded,
                format!("job {job_id} was superseded by a newer request"),
            )
        };

        for attempt in 1..=self.settings.max_poll_attempts {
            if !is_current() {
                return Err(superseded());
            }
            let status = self.poll_status(&job_id)?;
            log::debug!("{} job {job_id} attempt {attempt}: {status:?}", self.tool);
            on_progress(AlignmentProgress {
                job_id: job_id.clone(),
                attempt,
                status: Some(format!("{status:?}")),
                message: format!("Job {job_id}: {status:?}"),
            });
            match status {
                JobStatus::Finished => {
                    let text = self.fetch_result(&job_id)?;
                    return parse_pair_alignment(&text)?.into_full_alignment(seq1, seq2);
                }
                JobStatus::Failed(remote_status) => {
                    return Err(CrosswalkError::remote(format!(
                        "{} job {job_id} ended with status {remote_status}",
                        self.tool
                    )));
                }
                JobStatus::Queued | JobStatus::Running => {}
            }
            if attempt == self.settings.max_poll_attempts {
                break;
            }
            for remaining in (1..=self.settings.poll_interval_secs).rev() {
                if !is_current() {
                    return Err(superseded());
                }
                on_progress(AlignmentProgress {
                    job_id: job_id.clone(),
                    attempt,
                    status: None,
                    message: format!("Checking job {job_id} again in {remaining}s"),
                });
                thread::sleep(Duration::from_secs(1));
            }
        }

        Err(CrosswalkError::new(
            ErrorCode::Timeout,
            format!(
                "{} job {job_id} did not finish after {} status checks",
                self.tool, self.settings.max_poll_attempts
            ),
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Replays canned responses and records every request URL.
    pub(crate) struct ScriptedTransport {
        pub job_id: String,
        pub statuses: Mutex<VecDeque<String>>,
        pub result: String,
        pub requests: Mutex<Vec<String>>,
        pub forms: Mutex<Vec<Vec<(String, String)>>>,
        /// Set when any request is made from inside a rayon worker.
        pub called_on_rayon_worker: AtomicBool,
    }

    impl ScriptedTransport {
        pub(crate) fn new(statuses: &[&str], result: &str) -> Self {
            Self {
                job_id: "emboss_needle-R20251014-000001-0001-1-p1m".to_string(),
                statuses: Mutex::new(statuses.iter().map(|s| s.to_string()).collect()),
                result: result.to_string(),
                requests: Mutex::new(Vec::new()),
                forms: Mutex::new(Vec::new()),
                called_on_rayon_worker: AtomicBool::new(false),
            }
        }
    }

    impl JobTransport for ScriptedTransport {
        fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<String, CrosswalkError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.forms.lock().unwrap().push(
                form.iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            );
            Ok(format!("{}\n", self.job_id))
        }

        fn get_text(&self, url: &str) -> Result<String, CrosswalkError> {
            if rayon::current_thread_index().is_some() {
                self.called_on_rayon_worker.store(true, Ordering::SeqCst);
            }
            self.requests.lock().unwrap().push(url.to_string());
            if url.contains("/status/") {
                let next = self.statuses.lock().unwrap().pop_front();
                return Ok(next.unwrap_or_else(|| "RUNNING".to_string()));
            }
            if url.ends_with("/aln") {
                return Ok(self.result.clone());
            }
            Err(CrosswalkError::remote(format!("HTTP 404 Not Found from '{url}'")))
        }
    }

    pub(crate) const IDENTICAL_PAIR: &str = "\
# Program: needle
#=======================================

a                  1 MKAAY      5
                     |||||
b                  1 MKAAY      5
";

    fn settings(max_poll_attempts: usize) -> RemoteSettings {
        RemoteSettings {
            base_url: "https://alignment.example.org/rest/".to_string(),
            email: "lab@example.org".to_string(),
            poll_interval_secs: 0,
            max_poll_attempts,
            request_timeout_secs: 5,
        }
    }

    #[test]
    fn status_strings_parse() {
        assert_eq!(JobStatus::parse("RUNNING\n"), JobStatus::Running);
        assert_eq!(JobStatus::parse("finished"), JobStatus::Finished);
        assert_eq!(JobStatus::parse("QUEUED"), JobStatus::Queued);
        assert_eq!(
            JobStatus::parse("FAILURE"),
            JobStatus::Failed("FAILURE".to_string())
        );
        assert!(JobStatus::parse("NOT_FOUND").is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn polls_until_finished_and_parses_result() {
        let transport = Arc::new(ScriptedTransport::new(
            &["QUEUED", "RUNNING", "FINISHED"],
            IDENTICAL_PAIR,
        ));
        let client =
            RemoteAlignmentClient::new(transport.clone(), AlignmentAlgorithm::Needle, settings(10))
                .unwrap();
        let mut progress = Vec::new();
        let alignment = client
            .run("MKAAY", "MKAAY", &|| true, &mut |p| progress.push(p))
            .unwrap();
        assert_eq!(alignment.alns[0].seq, "MKAAY");
        assert_eq!(alignment.consensus, "|||||");
        assert_eq!(progress.len(), 3);
        assert_eq!(progress[2].status.as_deref(), Some("Finished"));

        let requests = transport.requests.lock().unwrap();
        assert_eq!(
            requests[0],
            "https://alignment.example.org/rest/emboss_needle/run"
        );
        assert!(requests.last().unwrap().ends_with("/result/emboss_needle-R20251014-000001-0001-1-p1m/aln"));

        let forms = transport.forms.lock().unwrap();
        assert!(forms[0].contains(&("email".to_string(), "lab@example.org".to_string())));
        assert!(forms[0].contains(&("asequence".to_string(), ">a\nMKAAY\n".to_string())));
    }

    #[test]
    fn failure_status_is_a_remote_error() {
        let transport = Arc::new(ScriptedTransport::new(&["RUNNING", "FAILURE"], ""));
        let client =
            RemoteAlignmentClient::new(transport, AlignmentAlgorithm::Water, settings(10)).unwrap();
        let err = client
            .run("MKA", "MKA", &|| true, &mut |_| {})
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Remote);
        assert!(err.message.contains("FAILURE"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn polling_is_bounded() {
        let transport = Arc::new(ScriptedTransport::new(&[], ""));
        let client =
            RemoteAlignmentClient::new(transport.clone(), AlignmentAlgorithm::Matcher, settings(4))
                .unwrap();
        let err = client
            .run("MKA", "MKA", &|| true, &mut |_| {})
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Timeout);
        let status_calls = transport
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.contains("/status/"))
            .count();
        assert_eq!(status_calls, 4);
    }

    #[test]
    fn superseded_job_stops_polling() {
        let transport = Arc::new(ScriptedTransport::new(&[], ""));
        let client =
            RemoteAlignmentClient::new(transport, AlignmentAlgorithm::Needle, settings(50)).unwrap();
        let err = client
            .run("MKA", "MKA", &|| false, &mut |_| {})
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Superseded);
    }

    #[test]
    fn local_algorithms_are_not_remote_tools() {
        let transport = Arc::new(ScriptedTransport::new(&[], ""));
        let err = RemoteAlignmentClient::new(
            transport,
            AlignmentAlgorithm::NeedlemanWunsch,
            settings(1),
        )
        .err()
        .unwrap();
        assert_eq!(err.code, ErrorCode::Unsupported);
    }
}
