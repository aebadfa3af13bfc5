//! GitHub REST implementation of [`RepositoryHost`].
//!
//! One blocking `ureq` agent per run. The agent-level timeout bounds every
//! request; expiry surfaces as [`HostError::Timeout`]. HTTP 404 on a lookup
//! is [`Lookup::NotFound`], every other non-success status is
//! [`HostError::Status`] carrying the API's `message`.

use std::io::Read;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use filesync_core::{ContentIdentity, HostSettings, RepoId};

use crate::error::{decode_err, HostError, Operation};
use crate::{
    BranchRef, DeleteContent, HostResult, Lookup, NewPullRequest, PullRequest, PutContent,
    RemoteFile, RepositoryHost, RepositoryInfo, RepositorySummary,
};

const API_VERSION: &str = "2022-11-28";
const MEDIA_JSON: &str = "application/vnd.github+json";
const MEDIA_RAW: &str = "application/vnd.github.raw+json";
const PAGE_SIZE: usize = 100;

/// GitHub (or GitHub Enterprise) REST client.
pub struct GitHubHost {
    agent: ureq::Agent,
    api_url: String,
    token: Option<String>,
}

impl GitHubHost {
    /// `api_url` is the REST root, e.g. `https://api.github.com`.
    pub fn new(api_url: &str, token: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("filesync/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            api_url: api_url.trim_end_matches('/').to_owned(),
            token,
        }
    }

    pub fn from_settings(settings: &HostSettings) -> Self {
        Self::new(
            &settings.api_url,
            settings.token.clone(),
            settings.request_timeout,
        )
    }

    fn repo_url(&self, repo: &RepoId, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}{tail}",
            self.api_url,
            urlencoding::encode(repo.owner()),
            urlencoding::encode(repo.name()),
        )
    }

    fn contents_url(&self, repo: &RepoId, path: &str) -> String {
        self.repo_url(repo, &format!("/contents/{}", encode_path(path)))
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        debug!(method, url, "github request");
        let request = self
            .agent
            .request(method, url)
            .set("Accept", MEDIA_JSON)
            .set("X-GitHub-Api-Version", API_VERSION);
        match &self.token {
            Some(token) => request.set("Authorization", &format!("Bearer {token}")),
            None => request,
        }
    }

    fn list_page(
        &self,
        url: &str,
        page: usize,
    ) -> Result<ureq::Response, ureq::Error> {
        self.request("GET", url)
            .query("per_page", &PAGE_SIZE.to_string())
            .query("page", &page.to_string())
            .call()
    }

    fn list_all(&self, url: &str) -> HostResult<Lookup<Vec<RepositorySummary>>> {
        let op = Operation::ListRepositories;
        let mut repos = Vec::new();
        for page in 1.. {
            let batch: Vec<RepoBody> = match self.list_page(url, page) {
                Ok(response) => decode(op, response)?,
                Err(ureq::Error::Status(404, _)) if page == 1 => return Ok(Lookup::NotFound),
                Err(err) => return Err(map_error(op, err)),
            };
            let last = batch.len() < PAGE_SIZE;
            repos.extend(batch.into_iter().map(|body| RepositorySummary {
                name: body.name,
                archived: body.archived,
            }));
            if last {
                break;
            }
        }
        Ok(Lookup::Found(repos))
    }

    // Files above the inline limit come back with `encoding: none`.
    fn get_raw(&self, url: &str, git_ref: &str) -> HostResult<Vec<u8>> {
        let op = Operation::GetContent;
        let response = self
            .request("GET", url)
            .set("Accept", MEDIA_RAW)
            .query("ref", git_ref)
            .call()
            .map_err(|err| map_error(op, err))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| decode_err(op, e.to_string()))?;
        Ok(bytes)
    }
}

impl RepositoryHost for GitHubHost {
    fn find_repository(&self, repo: &RepoId) -> HostResult<Lookup<RepositoryInfo>> {
        let op = Operation::FindRepository;
        let response = self.request("GET", &self.repo_url(repo, "")).call();
        Ok(match lookup::<RepoBody>(op, response)? {
            Lookup::Found(body) => Lookup::Found(RepositoryInfo {
                id: repo.clone(),
                default_branch: body.default_branch,
                archived: body.archived,
            }),
            Lookup::NotFound => Lookup::NotFound,
        })
    }

    fn get_branch(&self, repo: &RepoId, branch: &str) -> HostResult<Lookup<BranchRef>> {
        let op = Operation::GetBranch;
        let url = self.repo_url(repo, &format!("/git/ref/heads/{}", encode_path(branch)));
        let response = self.request("GET", &url).call();
        Ok(match lookup::<RefBody>(op, response)? {
            Lookup::Found(body) => Lookup::Found(BranchRef {
                name: branch.to_owned(),
                commit_sha: body.object.sha,
            }),
            Lookup::NotFound => Lookup::NotFound,
        })
    }

    fn create_branch(&self, repo: &RepoId, branch: &str, from_commit_sha: &str) -> HostResult<()> {
        let op = Operation::CreateBranch;
        self.request("POST", &self.repo_url(repo, "/git/refs"))
            .send_json(json!({
                "ref": format!("refs/heads/{branch}"),
                "sha": from_commit_sha,
            }))
            .map_err(|err| map_error(op, err))?;
        Ok(())
    }

    fn get_content(&self, repo: &RepoId, path: &str, git_ref: &str) -> HostResult<Lookup<RemoteFile>> {
        let op = Operation::GetContent;
        let url = self.contents_url(repo, path);
        let response = self.request("GET", &url).query("ref", git_ref).call();
        let body = match lookup::<ContentsBody>(op, response)? {
            Lookup::Found(ContentsBody::File(body)) => body,
            Lookup::Found(ContentsBody::Listing(_)) => {
                return Err(decode_err(op, format!("{path} is a directory")));
            }
            Lookup::NotFound => return Ok(Lookup::NotFound),
        };
        if body.kind != "file" {
            return Err(decode_err(op, format!("{path} is a {}", body.kind)));
        }

        let bytes = match body.encoding.as_str() {
            "base64" => {
                let compact: String = body.content.split_whitespace().collect();
                STANDARD
                    .decode(compact)
                    .map_err(|e| decode_err(op, e.to_string()))?
            }
            "none" => self.get_raw(&url, git_ref)?,
            other => return Err(decode_err(op, format!("unsupported encoding '{other}'"))),
        };

        Ok(Lookup::Found(RemoteFile {
            identity: ContentIdentity(body.sha),
            bytes,
        }))
    }

    fn put_content(&self, repo: &RepoId, request: PutContent<'_>) -> HostResult<()> {
        let op = Operation::PutContent;
        let mut body = json!({
            "message": request.message,
            "content": STANDARD.encode(request.bytes),
            "branch": request.branch,
        });
        if let Some(expected) = request.expected {
            body["sha"] = json!(expected.0);
        }
        self.request("PUT", &self.contents_url(repo, request.path))
            .send_json(body)
            .map_err(|err| map_error(op, err))?;
        Ok(())
    }

    fn delete_content(&self, repo: &RepoId, request: DeleteContent<'_>) -> HostResult<()> {
        let op = Operation::DeleteContent;
        self.request("DELETE", &self.contents_url(repo, request.path))
            .send_json(json!({
                "message": request.message,
                "sha": request.expected.0,
                "branch": request.branch,
            }))
            .map_err(|err| map_error(op, err))?;
        Ok(())
    }

    fn create_pull_request(
        &self,
        repo: &RepoId,
        request: NewPullRequest<'_>,
    ) -> HostResult<PullRequest> {
        let op = Operation::CreatePullRequest;
        let response = self
            .request("POST", &self.repo_url(repo, "/pulls"))
            .send_json(json!({
                "title": request.title,
                "head": request.head,
                "base": request.base,
                "draft": request.draft,
            }))
            .map_err(|err| map_error(op, err))?;
        let body: PullBody = decode(op, response)?;
        Ok(PullRequest {
            number: body.number,
            url: body.html_url,
        })
    }

    fn list_repositories(&self, org: &str) -> HostResult<Lookup<Vec<RepositorySummary>>> {
        let owner = urlencoding::encode(org);
        let org_url = format!("{}/orgs/{owner}/repos", self.api_url);
        match self.list_all(&org_url)? {
            Lookup::Found(repos) => Ok(Lookup::Found(repos)),
            Lookup::NotFound => {
                debug!(org, "organization not found, trying user repositories");
                self.list_all(&format!("{}/users/{owner}/repos", self.api_url))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RepoBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    default_branch: String,
    #[serde(default)]
    archived: bool,
}

#[derive(Debug, Deserialize)]
struct RefBody {
    object: RefObject,
}

#[derive(Debug, Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsBody {
    File(FileBody),
    Listing(Vec<serde_json::Value>),
}

#[derive(Debug, Deserialize)]
struct FileBody {
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Deserialize)]
struct PullBody {
    number: u64,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

// ---------------------------------------------------------------------------
// Response mapping
// ---------------------------------------------------------------------------

fn lookup<T: DeserializeOwned>(
    op: Operation,
    result: Result<ureq::Response, ureq::Error>,
) -> HostResult<Lookup<T>> {
    match result {
        Ok(response) => decode(op, response).map(Lookup::Found),
        Err(ureq::Error::Status(404, _)) => Ok(Lookup::NotFound),
        Err(err) => Err(map_error(op, err)),
    }
}

fn decode<T: DeserializeOwned>(op: Operation, response: ureq::Response) -> HostResult<T> {
    response
        .into_json::<T>()
        .map_err(|e| decode_err(op, e.to_string()))
}

fn map_error(operation: Operation, err: ureq::Error) -> HostError {
    match err {
        ureq::Error::Status(status, response) => HostError::Status {
            operation,
            status,
            message: response
                .into_json::<ApiMessage>()
                .map(|body| body.message)
                .unwrap_or_else(|_| "no message".to_owned()),
        },
        ureq::Error::Transport(transport) => {
            if is_timeout(&transport) {
                HostError::Timeout { operation }
            } else {
                HostError::Transport {
                    operation,
                    message: transport.to_string(),
                }
            }
        }
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    let mut source = std::error::Error::source(transport);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        source = err.source();
    }
    transport.kind() == ureq::ErrorKind::Io && transport.to_string().contains("timed out")
}

/// Percent-encode each segment of a repo-relative path. Empty and `.`
/// segments are dropped, so `./a/b.txt` and `/a/b.txt` both address `a/b.txt`.
pub(crate) fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Instant;

    #[test]
    fn encode_path_normalizes_and_escapes() {
        assert_eq!(encode_path("./foo.txt"), "foo.txt");
        assert_eq!(encode_path("/.github/workflows/ci.yml"), ".github/workflows/ci.yml");
        assert_eq!(encode_path("docs/read me.md"), "docs/read%20me.md");
        assert_eq!(encode_path("feature/x#1"), "feature/x%231");
    }

    #[test]
    fn repo_url_uses_trimmed_api_root() {
        let host = GitHubHost::new("https://ghe.example.com/api/v3/", None, Duration::from_secs(5));
        let url = host.repo_url(&RepoId::from("org/repo"), "/pulls");
        assert_eq!(url, "https://ghe.example.com/api/v3/repos/org/repo/pulls");
    }

    #[test]
    fn contents_body_distinguishes_files_and_directories() {
        let file: ContentsBody = serde_json::from_str(
            r#"{"type":"file","sha":"123","content":"Zm9v\nCg==\n","encoding":"base64"}"#,
        )
        .expect("file");
        match file {
            ContentsBody::File(body) => {
                let compact: String = body.content.split_whitespace().collect();
                assert_eq!(STANDARD.decode(compact).expect("b64"), b"foo\n");
                assert_eq!(body.sha, "123");
            }
            ContentsBody::Listing(_) => panic!("expected file"),
        }

        let listing: ContentsBody =
            serde_json::from_str(r#"[{"type":"file","name":"a"}]"#).expect("listing");
        assert!(matches!(listing, ContentsBody::Listing(_)));
    }

    #[test]
    fn refused_connection_is_a_transport_error() {
        // Bind then drop, so the port is known to have no listener.
        let port = TcpListener::bind("127.0.0.1:0")
            .and_then(|listener| listener.local_addr())
            .expect("bind")
            .port();
        let host = GitHubHost::new(&format!("http://127.0.0.1:{port}"), None, Duration::from_secs(2));
        let err = host
            .find_repository(&RepoId::from("org/repo"))
            .expect_err("nothing listens");
        assert_eq!(err.operation(), Operation::FindRepository);
        assert!(matches!(err, HostError::Transport { .. }), "got: {err}");
    }

    #[test]
    fn silent_server_times_out() {
        // Connections queue in the backlog and are never answered.
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let host = GitHubHost::new(&format!("http://{addr}"), None, Duration::from_secs(1));

        let started = Instant::now();
        let err = host
            .get_branch(&RepoId::from("org/repo"), "main")
            .expect_err("no response");
        assert!(err.is_timeout(), "got: {err}");
        assert_eq!(err.operation(), Operation::GetBranch);
        assert!(started.elapsed() < Duration::from_secs(10));
        drop(listener);
    }
}
