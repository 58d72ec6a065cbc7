#[cfg(test)]
mod tests {
    use chrono::Local;
    use rocket::http::{ContentType, RawStr, Status};
    use rocket::local::asynchronous::{Client, LocalResponse};
    use tempfile::TempDir;

    use crate::checklist::compute_completion;
    use crate::constants::CHECKLIST;
    use crate::database::init_database;
    use crate::db::get_report;
    use crate::env::Settings;
    use crate::reporting::format_date;
    use crate::test::test_utils::{
        STANDARD_PASSWORD, TestDbBuilder, create_standard_test_db, login_test_user,
        setup_test_client, setup_test_client_with_settings,
    };

    fn today() -> String {
        format_date(Local::now().date_naive())
    }

    fn location<'a>(response: &'a LocalResponse<'_>) -> Option<&'a str> {
        response.headers().get_one("Location")
    }

    async fn post_form<'c>(client: &'c Client, uri: &'static str, body: &str) -> LocalResponse<'c> {
        client
            .post(uri)
            .header(ContentType::Form)
            .body(body.to_string())
            .dispatch()
            .await
    }

    async fn log_actions(client: &Client) -> Vec<String> {
        let pool = client
            .rocket()
            .state::<sqlx::Pool<sqlx::Sqlite>>()
            .expect("pool managed");
        let rows: Vec<(String,)> = sqlx::query_as("SELECT action FROM logs ORDER BY id ASC")
            .fetch_all(pool)
            .await
            .expect("Failed to read logs");
        rows.into_iter().map(|(a,)| a).collect()
    }

    #[rocket::async_test]
    async fn test_login_page_renders() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;

        let response = client.get("/").dispatch().await;

        assert_eq!(response.status(), Status::Ok);
        let body = response.into_string().await.expect("body");
        assert!(body.contains("Iniciar sesión"));
    }

    #[rocket::async_test]
    async fn test_protected_pages_require_login() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;

        for endpoint in [
            "/checklist",
            "/dashboard",
            "/statistics",
            "/hospital_trends",
            "/logs",
            "/backup_bd",
        ] {
            let response = client.get(endpoint).dispatch().await;
            assert!(
                [Status::SeeOther, Status::Unauthorized, Status::Forbidden]
                    .contains(&response.status()),
                "Endpoint {} did not require authentication",
                endpoint
            );
            assert_eq!(location(&response), Some("/"), "{} should redirect", endpoint);
        }
    }

    #[rocket::async_test]
    async fn test_login_redirects_by_role() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;

        let response = post_form(
            &client,
            "/",
            &format!("username=admin_user&password={}", STANDARD_PASSWORD),
        )
        .await;
        assert_eq!(response.status(), Status::SeeOther);
        assert_eq!(location(&response), Some("/dashboard"));

        client.get("/logout").dispatch().await;

        let response = post_form(
            &client,
            "/",
            &format!("username=hgz24_user&password={}", STANDARD_PASSWORD),
        )
        .await;
        assert_eq!(location(&response), Some("/checklist"));

        let actions = log_actions(&client).await;
        assert_eq!(actions, vec!["successful login", "logout", "successful login"]);
    }

    #[rocket::async_test]
    async fn test_failed_login() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;

        let response = post_form(&client, "/", "username=hgz24_user&password=wrong").await;
        assert_eq!(response.status(), Status::SeeOther);
        assert_eq!(location(&response), Some("/"));

        let page = client.get("/").dispatch().await;
        let body = page.into_string().await.expect("body");
        assert!(body.contains("Usuario o contraseña incorrectos."));

        let response = client.get("/checklist").dispatch().await;
        assert_eq!(location(&response), Some("/"));

        assert_eq!(log_actions(&client).await, vec![
            "failed login attempt for username: hgz24_user"
        ]);
    }

    #[rocket::async_test]
    async fn test_role_separation() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;

        login_test_user(&client, "hgz24_user", STANDARD_PASSWORD).await;
        for endpoint in ["/dashboard", "/statistics", "/hospital_trends", "/logs", "/backup_bd"] {
            let response = client.get(endpoint).dispatch().await;
            assert_eq!(location(&response), Some("/"), "{} should be admin only", endpoint);
        }

        client.get("/logout").dispatch().await;
        login_test_user(&client, "admin_user", STANDARD_PASSWORD).await;

        let response = client.get("/checklist").dispatch().await;
        assert_eq!(location(&response), Some("/"));
    }

    #[rocket::async_test]
    async fn test_logout_ends_session() {
        let (client, pool) = setup_test_client(create_standard_test_db().await).await;

        login_test_user(&client, "hgz24_user", STANDARD_PASSWORD).await;
        assert_eq!(client.get("/checklist").dispatch().await.status(), Status::Ok);

        let response = client.get("/logout").dispatch().await;
        assert_eq!(location(&response), Some("/"));

        let (sessions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_sessions")
            .fetch_one(&pool)
            .await
            .expect("Count failed");
        assert_eq!(sessions, 0);

        let response = client.get("/checklist").dispatch().await;
        assert_eq!(location(&response), Some("/"));
    }

    #[rocket::async_test]
    async fn test_submit_and_resubmit_checklist() {
        let (client, pool) = setup_test_client(create_standard_test_db().await).await;
        login_test_user(&client, "hgz24_user", STANDARD_PASSWORD).await;

        let response = post_form(
            &client,
            "/checklist",
            "checklist[agua]=on&checklist[kits]=on&checklist[Tics_otro_text]=cableado\
             &observations=Falla+de+red&met_goal=false&operations_performed=5",
        )
        .await;
        assert_eq!(response.status(), Status::SeeOther);
        assert_eq!(location(&response), Some("/checklist"));

        let stored = get_report(&pool, "hgz24", &today())
            .await
            .expect("Query failed")
            .expect("Report should be stored");
        assert!(stored.checklist_data.is_checked("agua"));
        assert!(stored.checklist_data.is_checked("kits"));
        assert!(!stored.checklist_data.is_checked("red"));
        assert_eq!(stored.checklist_data.other_text("Tics"), "cableado");
        assert_eq!(stored.observations, "Falla de red");
        assert_eq!(stored.met_goal, Some(false));
        assert_eq!(stored.operations_performed, Some(5));

        let page = client.get("/checklist").dispatch().await;
        let body = page.into_string().await.expect("body");
        assert!(body.contains("¡Reporte guardado exitosamente!"));

        let response = post_form(
            &client,
            "/checklist",
            "met_goal=true&operations_performed=2",
        )
        .await;
        assert_eq!(location(&response), Some("/checklist"));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reports WHERE hospital_id = ?")
            .bind("hgz24")
            .fetch_one(&pool)
            .await
            .expect("Count failed");
        assert_eq!(count, 1);

        let stored = get_report(&pool, "hgz24", &today())
            .await
            .expect("Query failed")
            .expect("Report should be stored");
        assert_eq!(stored.met_goal, Some(true));
        assert_eq!(stored.operations_performed, None);
        assert!(!stored.checklist_data.is_checked("agua"));

        let actions = log_actions(&client).await;
        assert!(actions.contains(&format!("submitted daily report for hgz24 on {}", today())));
        assert!(actions.contains(&format!("updated daily report for hgz24 on {}", today())));
    }

    #[rocket::async_test]
    async fn test_full_checklist_with_spaced_and_accented_keys_is_complete() {
        let (client, pool) = setup_test_client(create_standard_test_db().await).await;
        login_test_user(&client, "hgz24_user", STANDARD_PASSWORD).await;

        let field = |key: &str| format!("checklist[{}]", RawStr::new(key).percent_encode());
        let mut body: Vec<String> = CHECKLIST
            .iter()
            .flat_map(|category| category.items.iter())
            .map(|item| format!("{}=on", field(item)))
            .collect();
        body.push(format!("{}=on", field("Conservación_otro_checkbox")));
        body.push(format!(
            "{}={}",
            field("Conservación_otro_text"),
            RawStr::new("gas medicinal").percent_encode()
        ));
        body.push("met_goal=true".to_string());

        let response = post_form(&client, "/checklist", &body.join("&")).await;
        assert_eq!(location(&response), Some("/checklist"));

        let stored = get_report(&pool, "hgz24", &today())
            .await
            .expect("Query failed")
            .expect("Report should be stored");
        for item in ["maquina de anestesia", "pagos a proveedores", "equipo dañado"] {
            assert!(stored.checklist_data.is_checked(item), "{} not stored as checked", item);
        }
        assert!(stored.checklist_data.other_checked("Conservación"));
        assert_eq!(stored.checklist_data.other_text("Conservación"), "gas medicinal");
        assert_eq!(compute_completion(&stored.checklist_data, CHECKLIST), 100.0);
    }

    #[rocket::async_test]
    async fn test_rejected_submission_keeps_stored_report() {
        let test_db = TestDbBuilder::new()
            .hospital_user("hgz24_user", "hgz24")
            .report("hgz24", &today(), false, Some(5))
            .build()
            .await
            .expect("Failed to build test database");
        let (client, pool) = setup_test_client(test_db).await;
        login_test_user(&client, "hgz24_user", STANDARD_PASSWORD).await;

        for (body, message) in [
            ("met_goal=false&operations_performed=8", "no puede ser mayor a 7"),
            ("met_goal=false&operations_performed=-1", "no puede ser mayor a 7"),
            ("met_goal=false&operations_performed=abc", "debe ser un valor numérico"),
            ("met_goal=false", "ingrese el número de operaciones"),
            ("operations_performed=3", "indique si se cumplió con la meta"),
        ] {
            let response = post_form(&client, "/checklist", body).await;
            assert_eq!(response.status(), Status::Ok);
            let page = response.into_string().await.expect("body");
            assert!(page.contains(message), "{} should show '{}'", body, message);
            // The stored values are echoed back.
            assert!(page.contains(r#"value="5""#));
        }

        let stored = get_report(&pool, "hgz24", &today())
            .await
            .expect("Query failed")
            .expect("Report should still exist");
        assert_eq!(stored.operations_performed, Some(5));
        assert_eq!(stored.met_goal, Some(false));
    }

    #[rocket::async_test]
    async fn test_dashboard_shows_progress() {
        let test_db = TestDbBuilder::new()
            .admin("admin_user")
            .hospital_user("hgz24_user", "hgz24")
            .report("hgz24", &today(), true, None)
            .build()
            .await
            .expect("Failed to build test database");
        let (client, _) = setup_test_client(test_db).await;
        login_test_user(&client, "admin_user", STANDARD_PASSWORD).await;

        let response = client.get("/dashboard").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body = response.into_string().await.expect("body");
        assert!(body.contains("Reportes de hoy: 1 / 5"));
        assert!(body.contains("Gineco 3A"));

        assert!(log_actions(&client).await.contains(&"accessed dashboard".to_string()));
    }

    #[rocket::async_test]
    async fn test_statistics_and_trends_pages() {
        let test_db = TestDbBuilder::new()
            .admin("admin_user")
            .report("hgz27", &today(), false, Some(4))
            .build()
            .await
            .expect("Failed to build test database");
        let (client, _) = setup_test_client(test_db).await;
        login_test_user(&client, "admin_user", STANDARD_PASSWORD).await;

        let response = client.get("/statistics").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body = response.into_string().await.expect("body");
        assert!(body.contains("Operaciones en el periodo: 4"));

        let response = post_form(
            &client,
            "/statistics",
            "start_date=2024-05-10&end_date=2024-05-01",
        )
        .await;
        assert_eq!(response.status(), Status::Ok);
        let body = response.into_string().await.expect("body");
        assert!(body.contains("La fecha de inicio no puede ser posterior a la fecha de fin."));
        assert!(body.contains("Operaciones en el periodo: 4"));

        let response = client
            .get("/hospital_trends?hospital_id=hgz27&start_date=bad&end_date=2024-05-01")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body = response.into_string().await.expect("body");
        assert!(body.contains("Formato de fecha inválido. Use AAAA-MM-DD."));
        assert!(body.contains("Tendencias: HGZ27"));

        let response = client.get("/hospital_trends").dispatch().await;
        let body = response.into_string().await.expect("body");
        assert!(body.contains("Seleccione un Hospital"));

        let actions = log_actions(&client).await;
        assert!(actions.contains(&"accessed statistics page".to_string()));
        assert!(actions.contains(&"accessed hospital trends page".to_string()));
    }

    #[rocket::async_test]
    async fn test_logs_page_lists_actions() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;
        post_form(&client, "/", "username=nobody&password=x").await;
        login_test_user(&client, "admin_user", STANDARD_PASSWORD).await;

        let response = client.get("/logs").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body = response.into_string().await.expect("body");
        assert!(body.contains("failed login attempt for username: nobody"));
        assert!(body.contains("successful login"));
    }

    #[rocket::async_test]
    async fn test_audit_failure_does_not_break_requests() {
        let (client, pool) = setup_test_client(create_standard_test_db().await).await;

        sqlx::query("DROP TABLE logs")
            .execute(&pool)
            .await
            .expect("Failed to drop logs table");

        login_test_user(&client, "hgz24_user", STANDARD_PASSWORD).await;

        let response = post_form(&client, "/checklist", "met_goal=true").await;
        assert_eq!(location(&response), Some("/checklist"));
        assert!(
            get_report(&pool, "hgz24", &today())
                .await
                .expect("Query failed")
                .is_some()
        );
    }

    #[rocket::async_test]
    async fn test_manual_backup() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let database_path = dir.path().join("hospital_checklist.db");
        let backup_dir = dir.path().join("BACKUP_BD");

        let file_pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                sqlx::sqlite::SqliteConnectOptions::new()
                    .filename(&database_path)
                    .create_if_missing(true),
            )
            .await
            .expect("Failed to open file database");
        init_database(&file_pool).await.expect("Failed to init database");

        let settings = Settings {
            database_path,
            backup_dir: backup_dir.clone(),
            ..Settings::default()
        };
        let (client, _) =
            setup_test_client_with_settings(create_standard_test_db().await, settings).await;
        login_test_user(&client, "admin_user", STANDARD_PASSWORD).await;

        let response = client.get("/backup_bd").dispatch().await;
        assert_eq!(location(&response), Some("/dashboard"));

        let snapshots = std::fs::read_dir(&backup_dir)
            .expect("Backup folder should exist")
            .count();
        assert_eq!(snapshots, 1);

        let body = client
            .get("/dashboard")
            .dispatch()
            .await
            .into_string()
            .await
            .expect("body");
        assert!(body.contains("Respaldo de la base de datos creado exitosamente."));
        assert!(
            log_actions(&client)
                .await
                .contains(&"manual database backup triggered".to_string())
        );
    }

    #[rocket::async_test]
    async fn test_manual_backup_failure_is_reported() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let settings = Settings {
            database_path: dir.path().join("missing.db"),
            backup_dir: dir.path().join("BACKUP_BD"),
            ..Settings::default()
        };
        let (client, _) =
            setup_test_client_with_settings(create_standard_test_db().await, settings).await;
        login_test_user(&client, "admin_user", STANDARD_PASSWORD).await;

        let response = client.get("/backup_bd").dispatch().await;
        assert_eq!(location(&response), Some("/dashboard"));

        let body = client
            .get("/dashboard")
            .dispatch()
            .await
            .into_string()
            .await
            .expect("body");
        assert!(body.contains("Error al crear el respaldo"));
        assert!(
            log_actions(&client)
                .await
                .iter()
                .any(|a| a.starts_with("manual database backup failed:"))
        );
    }
}
