//! Request rewriting.
//!
//! # Responsibilities
//! - Expand Docker Hub's implicit `library/` namespace in manifest and blob paths
//! - Expand it in the `scope` parameters of Docker Hub token requests
//! - Leave every other registry's path and query untouched
//!
//! # Design Decisions
//! - Every rewrite is total: no match means the input passes through
//! - Queries are only re-encoded when a scope actually changed

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use url::form_urlencoded;

use crate::routing::Registry;

/// `/v2/<name>/(manifests|blobs)/...` where `<name>` is a single segment.
static SINGLE_SEGMENT_OBJECT_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/v2/([^/]+)/(?:manifests|blobs)/.+$").expect("static regex")
});

static UNQUALIFIED_REPOSITORY_SCOPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^repository:([^:/]+):").expect("static regex"));

/// Path and query to send upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenTarget {
    pub path: String,
    pub query: Option<String>,
}

/// Apply the upstream-specific rewrite for `registry`.
pub fn rewrite_target(registry: Registry, path: &str, query: Option<&str>) -> RewrittenTarget {
    let (path, query) = match registry {
        Registry::DockerHub => (qualify_repository_path(path), query.map(Cow::Borrowed)),
        Registry::DockerAuth if path.starts_with("/token") => (
            Cow::Borrowed(path),
            query.map(|q| qualify_token_query(q).map_or(Cow::Borrowed(q), Cow::Owned)),
        ),
        _ => (Cow::Borrowed(path), query.map(Cow::Borrowed)),
    };

    if let Cow::Owned(ref rewritten) = path {
        tracing::debug!(rewritten = %rewritten, "Namespace missing in path, added library/");
    }

    RewrittenTarget {
        path: path.into_owned(),
        query: query.map(Cow::into_owned),
    }
}

/// `/v2/busybox/manifests/latest` → `/v2/library/busybox/manifests/latest`.
///
/// Only the first segment after `/v2/` is inspected, so namespaced paths
/// never match and the rewrite is idempotent.
pub fn qualify_repository_path(path: &str) -> Cow<'_, str> {
    if SINGLE_SEGMENT_OBJECT_PATH.is_match(path) {
        Cow::Owned(format!("/v2/library/{}", &path["/v2/".len()..]))
    } else {
        Cow::Borrowed(path)
    }
}

/// `repository:busybox:pull` → `repository:library/busybox:pull`.
pub fn qualify_scope(scope: &str) -> Cow<'_, str> {
    UNQUALIFIED_REPOSITORY_SCOPE.replace(scope, "repository:library/${1}:")
}

/// Rewrite every `scope` parameter of a token query.
///
/// Returns `None` when nothing changed so the raw query can be forwarded as
/// received.
pub fn qualify_token_query(query: &str) -> Option<String> {
    let mut changed = false;
    let pairs: Vec<(Cow<'_, str>, Cow<'_, str>)> = form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| {
            if key != "scope" {
                return (key, value);
            }
            let rewritten = match qualify_scope(&value) {
                Cow::Owned(scope) => Some(scope),
                Cow::Borrowed(_) => None,
            };
            match rewritten {
                Some(scope) => {
                    tracing::debug!(from = %value, to = %scope, "Namespace missing in scope, added library/");
                    changed = true;
                    (key, Cow::Owned(scope))
                }
                None => (key, value),
            }
        })
        .collect();

    if !changed {
        return None;
    }

    Some(
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_namespace_added() {
        assert_eq!(
            qualify_repository_path("/v2/busybox/manifests/latest"),
            "/v2/library/busybox/manifests/latest"
        );
        assert_eq!(
            qualify_repository_path("/v2/alpine/blobs/sha256:abc123"),
            "/v2/library/alpine/blobs/sha256:abc123"
        );
        assert_eq!(
            qualify_repository_path("/v2/alpine/blobs/uploads/"),
            "/v2/library/alpine/blobs/uploads/"
        );
    }

    #[test]
    fn test_path_rewrite_is_idempotent() {
        let once = qualify_repository_path("/v2/busybox/manifests/latest").into_owned();
        assert!(matches!(qualify_repository_path(&once), Cow::Borrowed(_)));
    }

    #[test]
    fn test_path_passthrough() {
        for path in [
            "/v2/",
            "/v2/myorg/app/manifests/1.0",
            "/v2/busybox/tags/list",
            "/v2/busybox/manifests/",
            "/v1/search",
        ] {
            assert!(matches!(qualify_repository_path(path), Cow::Borrowed(p) if p == path), "{path}");
        }
    }

    #[test]
    fn test_scope_rewrite() {
        assert_eq!(qualify_scope("repository:busybox:pull"), "repository:library/busybox:pull");
        assert_eq!(qualify_scope("repository:busybox:pull,push"), "repository:library/busybox:pull,push");
        assert_eq!(qualify_scope("repository:myorg/busybox:pull"), "repository:myorg/busybox:pull");
        assert_eq!(qualify_scope("registry:catalog:*"), "registry:catalog:*");
    }

    #[test]
    fn test_token_query_rewrite() {
        let query = "scope=repository%3Abusybox%3Apull&service=registry.docker.io";
        assert_eq!(
            qualify_token_query(query).as_deref(),
            Some("scope=repository%3Alibrary%2Fbusybox%3Apull&service=registry.docker.io")
        );
    }

    #[test]
    fn test_token_query_rewrites_every_scope() {
        let query = "service=registry.docker.io&scope=repository:a:pull&scope=repository:org/b:pull";
        assert_eq!(
            qualify_token_query(query).as_deref(),
            Some("service=registry.docker.io&scope=repository%3Alibrary%2Fa%3Apull&scope=repository%3Aorg%2Fb%3Apull")
        );
    }

    #[test]
    fn test_token_query_unchanged() {
        assert_eq!(qualify_token_query("scope=repository%3Amyorg%2Fbusybox%3Apull"), None);
        assert_eq!(qualify_token_query("service=registry.docker.io"), None);
        assert_eq!(qualify_token_query(""), None);
    }

    #[test]
    fn test_rewrite_target_dispatch() {
        let hub = rewrite_target(Registry::DockerHub, "/v2/nginx/manifests/1.25", Some("ns=docker.io"));
        assert_eq!(hub.path, "/v2/library/nginx/manifests/1.25");
        assert_eq!(hub.query.as_deref(), Some("ns=docker.io"));

        let auth = rewrite_target(Registry::DockerAuth, "/token", Some("scope=repository:nginx:pull"));
        assert_eq!(auth.path, "/token");
        assert_eq!(auth.query.as_deref(), Some("scope=repository%3Alibrary%2Fnginx%3Apull"));

        let auth_other = rewrite_target(Registry::DockerAuth, "/v2/", Some("scope=repository:nginx:pull"));
        assert_eq!(auth_other.query.as_deref(), Some("scope=repository:nginx:pull"));

        let quay = rewrite_target(Registry::Quay, "/v2/nginx/manifests/1.25", None);
        assert_eq!(quay.path, "/v2/nginx/manifests/1.25");
        assert_eq!(quay.query, None);
    }
}
