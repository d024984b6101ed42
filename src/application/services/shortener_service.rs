//! URL shortening service.
//!
//! Sits between the HTTP handlers and the repositories: applies the per-call
//! timeout, keeps each user's list of created ids, renders short URLs and
//! signs user tokens.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use metrics::counter;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use super::auth_service::UserTokenSigner;
use crate::domain::context::CallContext;
use crate::domain::entities::{Insertion, OwnedUrl, ShortId};
use crate::domain::repositories::{RepositoryError, UrlRepository, UserRepository};
use crate::error::AppError;

pub const URLS_CREATED_TOTAL: &str = "shortener_urls_created_total";
pub const URLS_DUPLICATE_TOTAL: &str = "shortener_urls_duplicate_total";

/// Default bound on a single storage call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Outcome of shortening one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortened {
    pub short_url: String,
    pub duplicate: bool,
}

/// Outcome of shortening several URLs; `short_urls` follows input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchShortened {
    pub short_urls: Vec<String>,
    pub duplicate: bool,
}

/// A freshly created user and the token identifying them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredUser {
    pub id: String,
    pub token: String,
}

/// A user's URL as returned by [`ShortenerService::user_urls`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUrl {
    pub short_url: String,
    pub original_url: String,
}

pub struct ShortenerService {
    urls: Arc<dyn UrlRepository>,
    users: Arc<dyn UserRepository>,
    signer: UserTokenSigner,
    base_url: String,
    request_timeout: Duration,
    /// Serializes read-modify-write of each user's id list.
    user_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ShortenerService {
    pub fn new(
        urls: Arc<dyn UrlRepository>,
        users: Arc<dyn UserRepository>,
        signer: UserTokenSigner,
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            urls,
            users,
            signer,
            base_url: base_url.into(),
            request_timeout,
            user_locks: DashMap::new(),
        }
    }

    /// Builds the public short URL for an id.
    pub fn short_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), id)
    }

    /// Shortens a URL and records it for `user`.
    ///
    /// A duplicate is reported through [`Shortened::duplicate`], not as an
    /// error; the id is still recorded for the user.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `raw` is not an absolute URL with a
    /// host, or the mapped repository error.
    pub async fn shorten(
        &self,
        ctx: &CallContext,
        raw: &str,
        user: Option<&str>,
    ) -> Result<Shortened, AppError> {
        let url = parse_target_url(raw)?;

        let ctx = ctx.with_timeout(self.request_timeout);
        let insertion = self.urls.create(&ctx, &url).await?;
        record_insertions(std::slice::from_ref(&insertion));

        let duplicate = insertion.is_duplicate();
        let id = insertion.into_id();

        if let Some(user) = user {
            self.remember(&ctx, user, std::slice::from_ref(&id)).await?;
        }

        Ok(Shortened {
            short_url: self.short_url(id.as_str()),
            duplicate,
        })
    }

    /// Shortens several URLs in one storage call.
    ///
    /// # Errors
    ///
    /// Fails as a whole when any entry is not a valid URL, naming its index.
    pub async fn shorten_batch(
        &self,
        ctx: &CallContext,
        raws: &[String],
        user: Option<&str>,
    ) -> Result<BatchShortened, AppError> {
        let urls = raws
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                parse_target_url(raw).map_err(|_| {
                    AppError::bad_request(
                        "Invalid URL in batch",
                        json!({ "index": index, "url": raw }),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if urls.is_empty() {
            return Ok(BatchShortened {
                short_urls: Vec::new(),
                duplicate: false,
            });
        }

        let ctx = ctx.with_timeout(self.request_timeout);
        let batch = self.urls.create_many(&ctx, &urls).await?;

        counter!(URLS_CREATED_TOTAL).increment(batch.inserted as u64);
        counter!(URLS_DUPLICATE_TOTAL).increment(batch.duplicates() as u64);

        if let Some(user) = user {
            self.remember(&ctx, user, &batch.ids).await?;
        }

        Ok(BatchShortened {
            short_urls: batch.ids.iter().map(|id| self.short_url(id.as_str())).collect(),
            duplicate: batch.duplicate,
        })
    }

    /// Looks up the original URL behind a short id.
    pub async fn resolve(&self, ctx: &CallContext, id: &str) -> Result<Url, AppError> {
        let ctx = ctx.with_timeout(self.request_timeout);
        Ok(self.urls.read(&ctx, id).await?)
    }

    /// Creates an empty user record and signs a token for it.
    pub async fn register_user(&self, ctx: &CallContext) -> Result<RegisteredUser, AppError> {
        let ctx = ctx.with_timeout(self.request_timeout);
        let id = self.users.create(&ctx, Vec::new()).await?;

        let token = self.signer.sign(&id).map_err(|e| {
            AppError::internal("Failed to sign user token", json!({ "reason": e.to_string() }))
        })?;

        debug!(user_id = %id, "Registered user");
        Ok(RegisteredUser { id, token })
    }

    /// Returns the user id carried by a valid token.
    pub fn authenticate(&self, token: &str) -> Option<String> {
        self.signer.verify(token).ok()
    }

    /// Lists the user's URLs in the order they were first recorded.
    ///
    /// Ids whose record is gone or soft-deleted are left out of the listing;
    /// the stored list itself is not pruned.
    pub async fn user_urls(&self, ctx: &CallContext, user: &str) -> Result<Vec<UserUrl>, AppError> {
        let ctx = ctx.with_timeout(self.request_timeout);
        let ids = self.owned_ids(&ctx, user).await?;

        let mut listed = Vec::with_capacity(ids.len());
        for id in ids {
            match self.urls.read(&ctx, &id).await {
                Ok(url) => {
                    let owned = OwnedUrl::new(id, url);
                    listed.push(UserUrl {
                        short_url: self.short_url(&owned.id),
                        original_url: owned.original_url.into(),
                    });
                }
                Err(RepositoryError::NotFound(id) | RepositoryError::Deleted(id)) => {
                    debug!(user_id = %user, id = %id, "Skipping unavailable URL");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(listed)
    }

    /// Soft-deletes the listed ids that belong to `user`.
    ///
    /// Ids the user never created are ignored. Returns how many ids were
    /// handed to storage.
    pub async fn delete_user_urls(
        &self,
        ctx: &CallContext,
        user: &str,
        ids: &[String],
    ) -> Result<usize, AppError> {
        let ctx = ctx.with_timeout(self.request_timeout);
        let owned = self.owned_ids(&ctx, user).await?;

        let mut targets: Vec<String> = Vec::new();
        for id in ids {
            if owned.contains(id) && !targets.contains(id) {
                targets.push(id.clone());
            }
        }

        if targets.len() < ids.len() {
            debug!(
                user_id = %user,
                requested = ids.len(),
                owned = targets.len(),
                "Ignoring ids not owned by the user"
            );
        }

        if targets.is_empty() {
            return Ok(0);
        }

        self.urls.delete(&ctx, &targets).await?;
        Ok(targets.len())
    }

    /// Checks that storage is reachable.
    pub async fn ping(&self, ctx: &CallContext) -> Result<(), AppError> {
        let ctx = ctx.with_timeout(self.request_timeout);
        Ok(self.urls.ping(&ctx).await?)
    }

    /// The user's recorded ids; an unknown user owns nothing.
    async fn owned_ids(&self, ctx: &CallContext, user: &str) -> Result<Vec<String>, AppError> {
        match self.users.read(ctx, user).await {
            Ok(ids) => Ok(ids),
            Err(RepositoryError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Appends ids the user does not own yet to their list.
    ///
    /// Concurrent calls for the same user are serialized within this process.
    async fn remember(
        &self,
        ctx: &CallContext,
        user: &str,
        ids: &[ShortId],
    ) -> Result<(), AppError> {
        let lock = self.user_locks.entry(user.to_owned()).or_default().value().clone();
        let _held = lock.lock().await;

        let mut owned = match self.users.read(ctx, user).await {
            Ok(owned) => owned,
            Err(RepositoryError::NotFound(_)) => {
                warn!(user_id = %user, "Unknown user, URL not recorded");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let before = owned.len();
        for id in ids {
            if !owned.iter().any(|known| known == id.as_str()) {
                owned.push(id.as_str().to_owned());
            }
        }

        if owned.len() != before {
            self.users.update(ctx, user, owned).await?;
        }

        Ok(())
    }
}

fn record_insertions(insertions: &[Insertion]) {
    for insertion in insertions {
        if insertion.is_duplicate() {
            counter!(URLS_DUPLICATE_TOTAL).increment(1);
        } else {
            counter!(URLS_CREATED_TOTAL).increment(1);
        }
    }
}

/// Parses a submitted URL, requiring an absolute URL with a host.
pub fn parse_target_url(raw: &str) -> Result<Url, AppError> {
    let trimmed = raw.trim();

    let url = Url::parse(trimmed).map_err(|e| {
        AppError::bad_request(
            "Invalid URL format",
            json!({ "url": trimmed, "reason": e.to_string() }),
        )
    })?;

    if !url.has_host() {
        return Err(AppError::bad_request(
            "URL must have a host",
            json!({ "url": trimmed }),
        ));
    }

    Ok(url)
}
