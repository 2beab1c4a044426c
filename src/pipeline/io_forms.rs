use log::{debug, info};

use crate::pipeline::*;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JSValue};
use std::collections::HashMap;

/// The form created for a match, stored as `form.json` next to the match data.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FormRecord {
    pub form_id: String,
    pub responder_uri: String,
}

// ********* Authentication ***********

pub const FORMS_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/forms.body",
    "https://www.googleapis.com/auth/forms.responses.readonly",
];
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Where the Forms access token comes from.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Credentials {
    AccessToken(String),
    /// Path to a service account JSON key file.
    ServiceAccount(PathBuf),
}

/// The fields of a service account key file used to mint tokens.
#[derive(Eq, PartialEq, Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(PartialEq, Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

/// Picks the credentials, `env` giving the value of an environment variable.
///
/// The access token variable comes first, then the key file variables of
/// `CREDENTIALS_FILE_ENVS`, then the `forms.credentialsFile` setting.
/// Empty values are ignored.
pub fn find_credentials<F>(settings: &Settings, env: F) -> PipelineResult<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |var: &str| env(var).filter(|x| !x.trim().is_empty());
    if let Some(token) = lookup(settings.token_env.as_str()) {
        return Ok(Credentials::AccessToken(token));
    }
    for &var in CREDENTIALS_FILE_ENVS.iter() {
        if let Some(path) = lookup(var) {
            debug!("find_credentials: key file from {}", var);
            return Ok(Credentials::ServiceAccount(PathBuf::from(path)));
        }
    }
    match &settings.credentials_file {
        Some(path) => Ok(Credentials::ServiceAccount(path.clone())),
        None => MissingCredentialsSnafu {
            token_var: settings.token_env.clone(),
            file_vars: CREDENTIALS_FILE_ENVS.join(" or "),
        }
        .fail(),
    }
}

pub fn read_service_account(path: &Path) -> PipelineResult<ServiceAccountKey> {
    debug!("read_service_account: {:?}", path);
    read_json(path)
}

/// The signed JWT exchanged for an access token, valid for one hour from
/// `issued_at` (seconds since the epoch).
pub fn service_account_assertion(
    key: &ServiceAccountKey,
    issued_at: i64,
) -> PipelineResult<String> {
    let claims = AssertionClaims {
        iss: key.client_email.clone(),
        scope: FORMS_SCOPES.join(" "),
        aud: key.token_uri.clone(),
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();
    let signing_key =
        EncodingKey::from_rsa_pem(key.private_key.as_bytes()).context(SigningTokenSnafu {
            account: key.client_email.clone(),
        })?;
    jsonwebtoken::encode(&header, &claims, &signing_key).context(SigningTokenSnafu {
        account: key.client_email.clone(),
    })
}

/// Exchanges a signed assertion for an access token at the key's token URI.
pub fn fetch_access_token(key: &ServiceAccountKey) -> PipelineResult<String> {
    let assertion = service_account_assertion(key, chrono::Utc::now().timestamp())?;
    let url = key.token_uri.as_str();
    debug!("fetch_access_token: {}", url);
    let resp = http_client()?
        .post(url)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .context(HttpSnafu { url })?;
    let body = response_json(resp, url)?;
    match body.get("access_token").and_then(|x| x.as_str()) {
        Some(token) => Ok(token.to_string()),
        None => UnexpectedResponseSnafu {
            url,
            message: "no access_token in the token response",
        }
        .fail(),
    }
}

// ********* Forms API ***********

/// A thin client over the Google Forms REST API.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FormsClient {
    base_url: String,
    token: String,
}

impl FormsClient {
    pub fn new(base_url: &str, token: &str) -> FormsClient {
        FormsClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Builds an authenticated client.
    ///
    /// An access token in the environment is used as is. Otherwise the
    /// service account key file is exchanged for a fresh token.
    pub fn from_settings(settings: &Settings) -> PipelineResult<FormsClient> {
        let token = match find_credentials(settings, |var| std::env::var(var).ok())? {
            Credentials::AccessToken(token) => {
                info!("Using the access token from {}", settings.token_env);
                token
            }
            Credentials::ServiceAccount(path) => {
                let key = read_service_account(&path)?;
                info!("Authenticating as service account {}", key.client_email);
                fetch_access_token(&key)?
            }
        };
        Ok(FormsClient::new(&settings.forms_base_url, &token))
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> PipelineResult<JSValue> {
        debug!("FormsClient::get: {} {:?}", url, query);
        let resp = http_client()?
            .get(url)
            .query(query)
            .bearer_auth(&self.token)
            .send()
            .context(HttpSnafu { url })?;
        response_json(resp, url)
    }

    fn post(&self, url: &str, body: &JSValue) -> PipelineResult<JSValue> {
        debug!("FormsClient::post: {}", url);
        let resp = http_client()?
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .context(HttpSnafu { url })?;
        response_json(resp, url)
    }

    /// Creates the form of a match and fills it with the survey questions.
    pub fn create_survey(&self, match_data: &MatchData) -> PipelineResult<FormRecord> {
        let title = form_title(match_data);
        let url = format!("{}/forms", self.base_url);
        let created = self.post(&url, &json!({ "info": { "title": title } }))?;
        let form_id = match created.get("formId").and_then(|x| x.as_str()) {
            Some(x) => x.to_string(),
            None => {
                return UnexpectedResponseSnafu {
                    url,
                    message: "no formId in the created form",
                }
                .fail()
            }
        };
        info!("Created form {} ({})", form_id, title);

        let requests = build_form_requests(&build_survey_structure(match_data));
        if !requests.is_empty() {
            let update_url = format!("{}/forms/{}:batchUpdate", self.base_url, form_id);
            self.post(&update_url, &json!({ "requests": requests }))?;
            info!("Added {} questions to form {}", requests.len(), form_id);
        }

        let responder_uri = created
            .get("responderUri")
            .and_then(|x| x.as_str())
            .map(|x| x.to_string())
            .unwrap_or_else(|| default_responder_uri(&form_id));
        Ok(FormRecord {
            form_id,
            responder_uri,
        })
    }

    /// Downloads every response of a form, keyed by question title.
    pub fn fetch_responses(&self, form_id: &str) -> PipelineResult<Vec<Response>> {
        let form = self.get(&format!("{}/forms/{}", self.base_url, form_id), &[])?;
        let titles = question_titles(&form);
        debug!("fetch_responses: {} questions", titles.len());

        let url = format!("{}/forms/{}/responses", self.base_url, form_id);
        let mut responses: Vec<Response> = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self.get(&url, &page_query(page_token.as_deref()))?;
            responses.extend(parse_responses(&page, &titles));
            page_token = page
                .get("nextPageToken")
                .and_then(|x| x.as_str())
                .filter(|x| !x.is_empty())
                .map(|x| x.to_string());
            if page_token.is_none() {
                break;
            }
        }
        info!("Fetched {} responses from form {}", responses.len(), form_id);
        Ok(responses)
    }
}

/// Query parameters of a responses page.
pub fn page_query(page_token: Option<&str>) -> Vec<(&'static str, &str)> {
    match page_token {
        Some(token) => vec![("pageToken", token)],
        None => vec![],
    }
}

pub fn default_responder_uri(form_id: &str) -> String {
    format!("https://docs.google.com/forms/d/{}/viewform", form_id)
}

/// Turns the survey sections into `createItem` requests of a batch update.
pub fn build_form_requests(questions: &[Question]) -> Vec<JSValue> {
    questions
        .iter()
        .enumerate()
        .map(|(index, q)| {
            let item = match q.kind {
                QuestionKind::RatingScale => json!({
                    "title": q.title,
                    "description": q.description.clone().unwrap_or_default(),
                    "textItem": {},
                }),
                QuestionKind::ManOfTheMatch => {
                    let options: Vec<JSValue> =
                        q.choices.iter().map(|c| json!({ "value": c })).collect();
                    json!({
                        "title": q.title,
                        "questionItem": {
                            "question": {
                                "required": false,
                                "choiceQuestion": { "type": "RADIO", "options": options },
                            }
                        },
                    })
                }
                _ => json!({
                    "title": q.title,
                    "questionItem": {
                        "question": {
                            "required": false,
                            "scaleQuestion": {
                                "low": RATING_MIN,
                                "high": RATING_MAX,
                                "lowLabel": RATING_LOW_LABEL,
                                "highLabel": RATING_HIGH_LABEL,
                            },
                        }
                    },
                }),
            };
            json!({ "createItem": { "item": item, "location": { "index": index } } })
        })
        .collect()
}

/// Question id to item title, for the questions of a form.
pub fn question_titles(form: &JSValue) -> HashMap<String, String> {
    let mut res: HashMap<String, String> = HashMap::new();
    let items = form.get("items").and_then(|x| x.as_array());
    for item in items.into_iter().flatten() {
        let qid = item
            .pointer("/questionItem/question/questionId")
            .and_then(|x| x.as_str());
        if let Some(qid) = qid {
            let title = item.get("title").and_then(|x| x.as_str()).unwrap_or("");
            res.insert(qid.to_string(), title.to_string());
        }
    }
    res
}

/// Reads one page of responses. Answers to unknown questions are keyed by
/// their question id.
pub fn parse_responses(page: &JSValue, titles: &HashMap<String, String>) -> Vec<Response> {
    let raw = page.get("responses").and_then(|x| x.as_array());
    raw.into_iter()
        .flatten()
        .map(|r| {
            let mut response = Response::new();
            if let Some(answers) = r.get("answers").and_then(|x| x.as_object()) {
                for (qid, answer) in answers.iter() {
                    let value = answer
                        .pointer("/textAnswers/answers/0/value")
                        .and_then(|x| x.as_str());
                    if let Some(value) = value {
                        let title = titles.get(qid).unwrap_or(qid);
                        response.insert(title.clone(), value.to_string());
                    }
                }
            }
            response
        })
        .collect()
}
