use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct RepoSummary {
    pub full_name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RepoDetails {
    pub description: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Account {
    pub login: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OrgDetails {
    pub description: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UserDetails {
    pub bio: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}
