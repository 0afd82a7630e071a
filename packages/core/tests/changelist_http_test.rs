//! Changelist HTTP Tests
//!
//! Drives the axum router in-process with `tower::ServiceExt::oneshot`.
//!
//! ## Test Coverage
//! - `POST /changelist` AJAX contract: `OK`, `FAIL: ...`, unknown command
//! - JSON error mapping for malformed requests and unknown ids
//! - `GET /changelist` pages and `GET /changelist/choices`
//! - Health check

#[cfg(test)]
mod changelist_http_tests {
    use anyhow::Result;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use outliner_core::http::{create_router, AppState, NOT_UNDERSTOOD};
    use outliner_core::{AdapterConfig, ListingAdapter, ListingMode, MemoryTreeStore, TreeStore};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Root (1) > [A (2), B (3) > [B1 (4)]]
    async fn create_test_app(mode: ListingMode) -> Result<(Router, Arc<MemoryTreeStore>)> {
        let store = Arc::new(MemoryTreeStore::new());
        let root = store.insert_node("Root", None).await?;
        store.insert_node("A", Some(root.id)).await?;
        let b = store.insert_node("B", Some(root.id)).await?;
        store.insert_node("B1", Some(b.id)).await?;

        let adapter = ListingAdapter::new(store.clone(), AdapterConfig::for_mode(mode));
        Ok((create_router(AppState::new(adapter)), store))
    }

    fn post_form(body: &str) -> Result<Request<Body>> {
        Ok(Request::builder()
            .method("POST")
            .uri("/changelist")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))?)
    }

    fn get(uri: &str) -> Result<Request<Body>> {
        Ok(Request::builder().uri(uri).body(Body::empty())?)
    }

    async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, String)> {
        let response = app.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        Ok((status, String::from_utf8(bytes.to_vec())?))
    }

    async fn send_json(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let (status, body) = send(app, request).await?;
        Ok((status, serde_json::from_str(&body)?))
    }

    #[tokio::test]
    async fn test_move_node_ok() -> Result<()> {
        let (app, store) = create_test_app(ListingMode::Outliner).await?;

        let (status, body) = send(
            &app,
            post_form("__cmd=move_node&node=3&target=2&position=before&parent=current")?,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");

        let b = store.get_node(3).await?.unwrap();
        let a = store.get_node(2).await?.unwrap();
        assert!(b.lft < a.lft);
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_move_is_fail_with_200() -> Result<()> {
        let (app, _store) = create_test_app(ListingMode::Outliner).await?;

        let (status, body) = send(
            &app,
            post_form("__cmd=move_node&node=3&target=4&position=after&parent=4")?,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            "FAIL: A node may not be made a child of any of its descendants."
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_command_is_plain_400() -> Result<()> {
        let (app, _store) = create_test_app(ListingMode::Outliner).await?;

        for form in ["__cmd=delete_node&node=3", "node=3&target=2"] {
            let (status, body) = send(&app, post_form(form)?).await?;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, NOT_UNDERSTOOD);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_move_is_json_400() -> Result<()> {
        let (app, _store) = create_test_app(ListingMode::Outliner).await?;

        let (status, body) = send_json(
            &app,
            post_form("__cmd=move_node&node=three&target=2&position=before&parent=current")?,
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");

        let (status, _) = send_json(
            &app,
            post_form("__cmd=move_node&node=3&target=2&position=before")?,
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_node_is_json_404() -> Result<()> {
        let (app, _store) = create_test_app(ListingMode::Outliner).await?;

        let (status, body) = send_json(
            &app,
            post_form("__cmd=move_node&node=3&target=99&position=after&parent=current")?,
        )
        .await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NODE_NOT_FOUND");
        assert_eq!(body["message"], "Node not found for 'target': 99");
        Ok(())
    }

    #[tokio::test]
    async fn test_changelist_page_in_tree_order() -> Result<()> {
        let (app, _store) = create_test_app(ListingMode::Outliner).await?;

        let (status, page) = send_json(&app, get("/changelist?o=-title")?).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["mode"], "outliner");
        assert_eq!(page["isBrowsing"], false);
        let titles: Vec<&str> = page["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Root", "A", "B", "B1"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_browsing_page_has_crumbs() -> Result<()> {
        let (app, _store) = create_test_app(ListingMode::Browsing).await?;

        let (status, page) = send_json(&app, get("/changelist?parent=3&o=title")?).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["isBrowsing"], true);
        assert_eq!(page["results"].as_array().unwrap().len(), 1);
        assert_eq!(page["results"][0]["title"], "B1");
        assert_eq!(page["crumbs"][0]["title"], "Root");
        assert_eq!(page["crumbs"][1]["title"], "B");
        assert_eq!(page["crumbQuery"], "o=title");

        let (status, _) = send_json(&app, get("/changelist?parent=x")?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_choices_endpoint() -> Result<()> {
        let (app, _store) = create_test_app(ListingMode::Outliner).await?;

        let (status, choices) =
            send_json(&app, get("/changelist/choices?level_indicator=*")?).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(choices[3]["id"], 4);
        assert_eq!(choices[3]["label"], "** B1");
        Ok(())
    }

    #[tokio::test]
    async fn test_health_check() -> Result<()> {
        let (app, _store) = create_test_app(ListingMode::Outliner).await?;

        let (status, health) = send_json(&app, get("/api/health")?).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "ok");
        Ok(())
    }
}
