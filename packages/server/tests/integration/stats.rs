use std::time::Duration;

use crate::common::{TestApp, routes};

/// Poll the access stats until the expected total shows up, or time out.
///
/// Access logging is fire-and-forget, so the write can land shortly
/// after the fetch response.
async fn wait_for_access_total(app: &TestApp, token: &str, expected: u64) -> serde_json::Value {
    for _ in 0..50 {
        let res = app.get_with_token(routes::STATS_ACCESS, token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        let total: u64 = res.body["values"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_u64())
            .sum();
        if total >= expected {
            return res.body;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("Access stats never reached {expected}");
}

mod access {
    use super::*;

    #[tokio::test]
    async fn access_stats_count_views_and_downloads() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv30", "pass1234", "lecturer")
            .await;
        let id = app.seed_material(&token, "Tracked", b"tracked bytes").await;

        let _ = app.get_raw(&routes::material_download(id)).await;
        let _ = app.get_raw(&routes::material_download(id)).await;
        let _ = app.get_raw(&routes::material_view(id)).await;

        let body = wait_for_access_total(&app, &token, 3).await;

        let labels = body["labels"].as_array().unwrap();
        let values = body["values"].as_array().unwrap();
        assert_eq!(labels.len(), 7);
        assert_eq!(values.len(), 7);
        let total: u64 = values.iter().filter_map(|v| v.as_u64()).sum();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn access_stats_window_is_seven_days() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv31", "pass1234", "lecturer")
            .await;

        let res = app.get_with_token(routes::STATS_ACCESS, &token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["labels"].as_array().unwrap().len(), 7);
        let values = res.body["values"].as_array().unwrap();
        assert!(values.iter().all(|v| v.as_u64() == Some(0)));
    }

    #[tokio::test]
    async fn failed_fetches_are_not_counted() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv32", "pass1234", "lecturer")
            .await;

        let res = app.get_without_token(&routes::material_download(555)).await;
        assert_eq!(res.status, 404);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let res = app.get_with_token(routes::STATS_ACCESS, &token).await;
        let total: u64 = res.body["values"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_u64())
            .sum();
        assert_eq!(total, 0);
    }
}

mod activity {
    use super::*;

    #[tokio::test]
    async fn activity_stats_bucket_mutations() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv33", "pass1234", "lecturer")
            .await;

        let id = app.seed_material(&token, "Busy", b"activity payload").await;
        let res = app
            .update_material(id, "Busier", "CNTT", "CS101", None, &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.get_with_token(routes::STATS_ACTIVITY, &token).await;
        assert_eq!(res.status, 200, "{}", res.text);

        let buckets = res.body["buckets"].as_array().unwrap();
        let total: u64 = buckets
            .iter()
            .filter_map(|b| b["count"].as_u64())
            .sum();
        assert_eq!(total, 2);

        let actions: Vec<String> = buckets
            .iter()
            .flat_map(|b| b["actions"].as_array().unwrap().clone())
            .filter_map(|a| a.as_str().map(str::to_string))
            .collect();
        assert!(actions.contains(&"UPLOAD".to_string()));
        assert!(actions.contains(&"EDIT".to_string()));
    }

    #[tokio::test]
    async fn delete_is_recorded() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv34", "pass1234", "lecturer")
            .await;

        let id = app.seed_material(&token, "Gone", b"delete payload").await;
        let res = app.delete_with_token(&routes::material(id), &token).await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(routes::STATS_ACTIVITY, &token).await;
        let actions: Vec<String> = res.body["buckets"]
            .as_array()
            .unwrap()
            .iter()
            .flat_map(|b| b["actions"].as_array().unwrap().clone())
            .filter_map(|a| a.as_str().map(str::to_string))
            .collect();
        assert!(actions.contains(&"DELETE".to_string()));
    }
}

mod capability {
    use super::*;

    #[tokio::test]
    async fn students_cannot_view_stats() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("hv10", "pass1234").await;

        let res = app.get_with_token(routes::STATS_ACCESS, &token).await;
        assert_eq!(res.status, 403);
        assert_eq!(res.code(), "PERMISSION_DENIED");

        let res = app.get_with_token(routes::STATS_ACTIVITY, &token).await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn stats_require_authentication() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::STATS_ACCESS).await;
        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn admins_can_view_stats() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("admin1", "pass1234", "admin")
            .await;

        let res = app.get_with_token(routes::STATS_ACCESS, &token).await;
        assert_eq!(res.status, 200, "{}", res.text);
    }
}
