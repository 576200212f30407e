use crate::error::{Rc4GitError, Result};
use crate::github::types::{Account, OrgDetails, RepoDetails, RepoSummary, UserDetails, Visibility};
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde::Serialize;

const PER_PAGE: usize = 100;
const MAX_PAGES: u32 = 10;

#[derive(Serialize)]
struct PageParams<'a> {
    per_page: usize,
    page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    visibility: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    affiliation: Option<&'a str>,
}

/// GitHub REST client for one token (login or private-repo scope).
#[derive(Clone)]
pub struct GitHubClient {
    octo: Octocrab,
}

impl GitHubClient {
    pub fn new(token: &str, base_uri: &str) -> Result<Self> {
        let octo = Octocrab::builder()
            .personal_token(token.to_string())
            .base_uri(base_uri)
            .map_err(|e| Rc4GitError::GitHub(e.to_string()))?
            .build()
            .map_err(|e| Rc4GitError::GitHub(e.to_string()))?;
        Ok(Self { octo })
    }

    /// Repositories the user owns or reaches through org membership.
    pub async fn list_user_repos(&self, visibility: Visibility) -> Result<Vec<RepoSummary>> {
        self.paginate(
            "/user/repos",
            Some(visibility.as_str()),
            Some("owner,organization_member"),
        )
        .await
    }

    pub async fn list_orgs(&self) -> Result<Vec<Account>> {
        self.paginate("/user/orgs", None, None).await
    }

    /// Needs the private-repo scope.
    pub async fn list_collaborators(&self, owner: &str, repo: &str) -> Result<Vec<Account>> {
        self.paginate(&format!("/repos/{owner}/{repo}/collaborators"), None, None)
            .await
    }

    pub async fn list_org_members(&self, org: &str) -> Result<Vec<Account>> {
        self.paginate(&format!("/orgs/{org}/members"), None, None).await
    }

    pub async fn repo(&self, owner: &str, repo: &str) -> Result<RepoDetails> {
        Ok(self
            .octo
            .get(format!("/repos/{owner}/{repo}"), None::<&()>)
            .await?)
    }

    pub async fn org(&self, org: &str) -> Result<OrgDetails> {
        Ok(self.octo.get(format!("/orgs/{org}"), None::<&()>).await?)
    }

    pub async fn current_user(&self) -> Result<UserDetails> {
        Ok(self.octo.get("/user", None::<&()>).await?)
    }

    async fn paginate<T: DeserializeOwned>(
        &self,
        route: &str,
        visibility: Option<&str>,
        affiliation: Option<&str>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let params = PageParams {
                per_page: PER_PAGE,
                page,
                visibility,
                affiliation,
            };
            let batch: Vec<T> = self.octo.get(route, Some(&params)).await?;
            let done = batch.len() < PER_PAGE;
            items.extend(batch);

            if done || page >= MAX_PAGES {
                break;
            }
            page += 1;
        }

        tracing::debug!(route, count = items.len(), "github list fetched");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn lists_repos_with_visibility_and_affiliation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/repos"))
            .and(query_param("visibility", "private"))
            .and(query_param("affiliation", "owner,organization_member"))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"full_name": "acme/secret", "private": true}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = GitHubClient::new("token", &server.uri()).unwrap();
        let repos = client.list_user_repos(Visibility::Private).await.unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].full_name, "acme/secret");
    }

    #[tokio::test]
    async fn follows_full_pages() {
        let server = MockServer::start().await;
        let full: Vec<_> = (0..100).map(|i| json!({"login": format!("m{i}")})).collect();
        Mock::given(method("GET"))
            .and(path("/orgs/acme/members"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(full)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/members"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"login": "last"}])))
            .mount(&server)
            .await;

        let client = GitHubClient::new("token", &server.uri()).unwrap();
        let members = client.list_org_members("acme").await.unwrap();
        assert_eq!(members.len(), 101);
        assert_eq!(members[100].login, "last");
    }

    #[tokio::test]
    async fn reads_repo_description() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "full_name": "acme/widgets",
                "description": "Widget factory"
            })))
            .mount(&server)
            .await;

        let client = GitHubClient::new("token", &server.uri()).unwrap();
        let repo = client.repo("acme", "widgets").await.unwrap();
        assert_eq!(repo.description.as_deref(), Some("Widget factory"));
    }
}
