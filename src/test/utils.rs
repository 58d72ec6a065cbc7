#[cfg(test)]
pub mod test_db {
    use crate::auth::Role;
    use crate::checklist::ChecklistData;
    use crate::constants::CHECKLIST;
    use crate::database::CURRENT_SCHEMA;
    use crate::db::{create_user, submit_report};
    use crate::error::AppError;
    use crate::models::NewReport;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Pool, Sqlite};
    use std::collections::HashMap;
    use std::sync::Once;
    use tracing::log::LevelFilter;

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    #[derive(Default)]
    pub struct TestDbBuilder {
        users: Vec<TestUser>,
        reports: Vec<TestReport>,
    }

    pub struct TestUser {
        pub username: String,
        pub role: Role,
        pub hospital_id: Option<String>,
        pub password: String,
    }

    pub struct TestReport {
        pub hospital_id: String,
        pub date: String,
        pub checked_items: Vec<String>,
        pub observations: String,
        pub met_goal: bool,
        pub operations_performed: Option<i64>,
        pub submitted_at: String,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn admin(mut self, username: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                role: Role::Admin,
                hospital_id: None,
                password: STANDARD_PASSWORD.to_string(),
            });
            self
        }

        pub fn hospital_user(mut self, username: &str, hospital_id: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                role: Role::Hospital,
                hospital_id: Some(hospital_id.to_string()),
                password: STANDARD_PASSWORD.to_string(),
            });
            self
        }

        /// A report with every checklist item unchecked.
        pub fn report(
            self,
            hospital_id: &str,
            date: &str,
            met_goal: bool,
            operations_performed: Option<i64>,
        ) -> Self {
            self.report_with_items(hospital_id, date, met_goal, operations_performed, &[], "")
        }

        pub fn report_with_items(
            mut self,
            hospital_id: &str,
            date: &str,
            met_goal: bool,
            operations_performed: Option<i64>,
            checked_items: &[&str],
            observations: &str,
        ) -> Self {
            self.reports.push(TestReport {
                hospital_id: hospital_id.to_string(),
                date: date.to_string(),
                checked_items: checked_items.iter().map(|s| s.to_string()).collect(),
                observations: observations.to_string(),
                met_goal,
                operations_performed,
                submitted_at: format!("{}T08:00:00.000000", date),
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = env_logger::builder()
                    .filter_level(LevelFilter::Debug)
                    .is_test(true)
                    .try_init();
            });

            // A single connection that never expires keeps the in-memory database alive.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await?;

            sqlx::raw_sql(CURRENT_SCHEMA).execute(&pool).await?;

            let mut user_id_map: HashMap<String, i64> = HashMap::new();

            for user in &self.users {
                let user_id = create_user(
                    &pool,
                    &user.username,
                    &user.password,
                    user.role,
                    user.hospital_id.as_deref(),
                )
                .await?;

                user_id_map.insert(user.username.clone(), user_id);
            }

            for report in &self.reports {
                let submitted_by = self
                    .users
                    .iter()
                    .find(|u| u.hospital_id.as_deref() == Some(report.hospital_id.as_str()))
                    .or_else(|| self.users.first())
                    .and_then(|u| user_id_map.get(&u.username).copied());

                let submitted_by = match submitted_by {
                    Some(id) => id,
                    None => {
                        create_user(
                            &pool,
                            &format!("seed_{}", report.hospital_id),
                            STANDARD_PASSWORD,
                            Role::Hospital,
                            Some(&report.hospital_id),
                        )
                        .await?
                    }
                };

                let mut checklist_data = ChecklistData::empty(CHECKLIST);
                for item in &report.checked_items {
                    checklist_data.set_flag(item, true);
                }

                let new_report = NewReport {
                    hospital_id: report.hospital_id.clone(),
                    date: report.date.clone(),
                    checklist_data,
                    observations: report.observations.clone(),
                    met_goal: report.met_goal,
                    operations_performed: if report.met_goal {
                        None
                    } else {
                        report.operations_performed
                    },
                    submitted_by,
                };

                submit_report(&pool, &new_report, &report.submitted_at).await?;
            }

            Ok(TestDb { pool, user_id_map })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub user_id_map: HashMap<String, i64>,
    }

    impl TestDb {
        pub fn user_id(&self, username: &str) -> Option<i64> {
            self.user_id_map.get(username).copied()
        }

        pub async fn report_count(&self, hospital_id: &str) -> Result<i64, sqlx::Error> {
            let (count,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM reports WHERE hospital_id = ?")
                    .bind(hospital_id)
                    .fetch_one(&self.pool)
                    .await?;
            Ok(count)
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    pub use super::test_db::{STANDARD_PASSWORD, TestDb, TestDbBuilder};

    use crate::env::Settings;
    use crate::init_rocket;
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use sqlx::{Pool, Sqlite};

    /// One administrator and one operator for each of two units.
    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .admin("admin_user")
            .hospital_user("hgz24_user", "hgz24")
            .hospital_user("hgz27_user", "hgz27")
            .build()
            .await
            .expect("Failed to build test database")
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, Pool<Sqlite>) {
        setup_test_client_with_settings(test_db, Settings::default()).await
    }

    pub async fn setup_test_client_with_settings(
        test_db: TestDb,
        settings: Settings,
    ) -> (Client, Pool<Sqlite>) {
        let pool = test_db.pool.clone();
        let rocket = init_rocket(test_db.pool, settings).await;

        let client = Client::tracked(rocket)
            .await
            .expect("valid rocket instance");

        (client, pool)
    }

    pub async fn login_test_user(client: &Client, username: &str, password: &str) {
        let response = client
            .post("/")
            .header(ContentType::Form)
            .body(format!("username={}&password={}", username, password))
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::SeeOther);
        assert_ne!(
            response.headers().get_one("Location"),
            Some("/"),
            "Login failed for {}",
            username
        );
    }
}
