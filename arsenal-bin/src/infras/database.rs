use arsenal_db::{profiles::ProfileFinder, MIGRATIONS};
use diesel_migrations::MigrationHarness;
use rocket::fairing::{AdHoc, Fairing};
use serde::Deserialize;

#[database("arsenal")]
pub struct DbConn(diesel::SqliteConnection);

/// Configuration section `bootstrap`: accounts promoted to admin
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bootstrap {
    #[serde(default)]
    pub admins: Vec<String>,
}

impl Bootstrap {
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admins
            .iter()
            .any(|x| x.trim().eq_ignore_ascii_case(email.trim()))
    }
}

fn default_event_cost() -> i64 {
    1
}

/// Configuration section `credits`
#[derive(Debug, Clone, Deserialize)]
pub struct CreditPolicy {
    #[serde(default = "default_event_cost")]
    pub event_cost: i64,
    #[serde(default)]
    pub signup_grant: i64,
}

// Run the embedded migrations, then promote the bootstrap admins that already registered.
pub fn migrations_fairing() -> impl Fairing {
    AdHoc::try_on_ignite("Run database migrations", |rocket| async move {
        let conn = match DbConn::get_one(&rocket).await {
            Some(c) => c,
            None => {
                log::error!("No database connection available for migrations");
                return Err(rocket);
            }
        };
        let bootstrap = rocket.state::<Bootstrap>().cloned().unwrap_or_default();

        let result = conn
            .run(move |c| -> anyhow::Result<usize> {
                c.run_pending_migrations(MIGRATIONS)
                    .map_err(|e| anyhow::anyhow!("migration failed: {}", e))?;
                let mut promoted = 0;
                for profile in ProfileFinder::list_info(c)? {
                    if !profile.is_admin() && bootstrap.is_admin_email(profile.get_email()) {
                        profile.set_admin(true).update(c)?;
                        promoted += 1;
                    }
                }
                Ok(promoted)
            })
            .await;

        match result {
            Ok(n) => {
                if n > 0 {
                    log::info!("Promoted {} bootstrap account(s) to admin", n);
                }
                Ok(rocket)
            }
            Err(e) => {
                log::error!("Failed to prepare the database: {:?}", e);
                Err(rocket)
            }
        }
    })
}
