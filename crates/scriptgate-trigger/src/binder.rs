//! Binding builder: request snapshot → execution context.

use scriptgate_core::{ExecutionContext, HttpContext, ResponseBindings};

use crate::ingest::RequestSnapshot;

/// Build the bindings for one invocation. Response bindings start at their
/// defaults: no headers, status 200, no binary body.
pub fn build_context(snapshot: RequestSnapshot) -> ExecutionContext {
    let http_context = HttpContext {
        method: snapshot.method.clone(),
        path: snapshot.path.clone(),
        query: snapshot.raw_query,
        headers: snapshot.headers,
        content_type: snapshot.content_type,
        content_length: snapshot.content_length,
    };

    ExecutionContext {
        query: snapshot.query,
        cookies: snapshot.cookies,
        path: snapshot.path,
        method: snapshot.method,
        http_context,
        form: snapshot.form,
        json: snapshot.json,
        body: snapshot.body,
        response: ResponseBindings::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{FORM_URLENCODED, JSON, ingest};
    use bytes::Bytes;
    use http::Request;
    use http_body_util::Full;
    use scriptgate_core::bindings;

    async fn context_for(content_type: &str, body: &'static str) -> ExecutionContext {
        let request = Request::builder()
            .method("PUT")
            .uri("/items?id=7")
            .header("content-type", content_type)
            .header("cookie", "sid=1")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap();
        build_context(ingest(request).await)
    }

    #[tokio::test]
    async fn required_bindings_are_always_present() {
        let context = context_for("text/plain", "hi").await;
        let names = context.binding_names();
        for name in [
            bindings::GET,
            bindings::COOKIE,
            bindings::REQUEST_PATH,
            bindings::REQUEST_METHOD,
            bindings::RAWPOSTDATASTREAM,
            bindings::HEADERS,
            bindings::STATUSCODE,
            bindings::BINARYRESPONSE,
        ] {
            assert!(names.contains(&name), "missing {name}");
        }
        assert_eq!(context.response, ResponseBindings::default());
        assert_eq!(context.method, "PUT");
        assert_eq!(context.path, "/items");
        assert_eq!(context.query.get("id").as_deref(), Some("7"));
        assert_eq!(context.cookies["sid"], "1");
        assert_eq!(context.http_context.query, "id=7");
    }

    #[tokio::test]
    async fn form_bodies_bind_post_only() {
        let context = context_for(FORM_URLENCODED, "a=1&b=2").await;
        let names = context.binding_names();
        assert!(names.contains(&bindings::POST));
        assert!(!names.contains(&bindings::JSONDATA));
        let form = context.form.unwrap();
        assert_eq!(form.get("a").as_deref(), Some("1"));
        assert_eq!(form.get("b").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn json_bodies_bind_jsondata_only() {
        let context = context_for(JSON, "{}").await;
        let names = context.binding_names();
        assert!(names.contains(&bindings::JSONDATA));
        assert!(!names.contains(&bindings::POST));
        assert_eq!(context.json.as_deref(), Some("{}"));
        assert_eq!(context.body.read_to_end(), "{}".as_bytes());
    }
}
