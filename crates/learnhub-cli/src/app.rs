//! Command handlers for the LearnHub terminal client.
//!
//! `App` owns the configuration and the session. Each command restores the
//! session first, checks the relevant route guard and only then talks to
//! protected endpoints, the same order a browser front end follows.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use learnhub_core::auth::{
    Credentials, GuardDecision, RecordingNavigator, Registration, RouteGuard, SessionManager,
    SessionPhase, SessionSnapshot,
};
use learnhub_core::models::Role;
use learnhub_core::Config;
use tracing::{debug, info, warn};

pub struct App {
    pub config: Config,
    pub session: SessionManager,
    pub navigator: Arc<RecordingNavigator>,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        debug!(api_url = %config.api_url, storage = ?config.storage, "Configuration loaded");

        let navigator = Arc::new(RecordingNavigator::new(&config.login_path));
        let session = config.connect(navigator.clone())?;

        Ok(Self {
            config,
            session,
            navigator,
        })
    }

    /// Restore the persisted session, showing progress while it is verified
    pub async fn restore_session(&self) -> SessionSnapshot {
        eprint!("Checking session...");
        let _ = io::stderr().flush();
        let snapshot = self.session.initialize().await;
        eprintln!(" done");
        snapshot
    }

    /// Run the guard for `path`. Prints where the user was sent and returns
    /// false when the view may not render.
    fn guard(&self, guard: &RouteGuard, path: &str) -> bool {
        match self.session.authorize(guard, path) {
            GuardDecision::Allow => true,
            GuardDecision::Pending => {
                eprintln!("Session is still loading, try again.");
                false
            }
            GuardDecision::Redirect { to, .. } if to == self.config.login_path => {
                eprintln!("Not signed in. Run `learnhub login` first.");
                false
            }
            GuardDecision::Redirect { to, .. } => {
                eprintln!("Access denied for {} (redirected to {}).", path, to);
                false
            }
        }
    }

    fn remember_email(&mut self, email: &str) {
        self.config.last_email = Some(email.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        let snapshot = self.restore_session().await;
        if let Some(user) = snapshot.user {
            println!("Already signed in as {} ({}).", user.display_name(), user.role);
            return Ok(());
        }

        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => prompt("Email: ")?,
        };
        let password = prompt_password()?;
        if email.is_empty() || password.is_empty() {
            return Err(anyhow::anyhow!("Email and password required"));
        }

        let credentials = Credentials {
            email: email.clone(),
            password,
        };
        match self.session.login(&credentials).await {
            Ok(user) => {
                self.remember_email(&email);
                info!(user_id = user.id, "Signed in");
                println!(
                    "[{}] Welcome, {}! Continue at {}",
                    user.initials,
                    user.display_name(),
                    self.navigator.current()
                );
                Ok(())
            }
            Err(e) => {
                let message = self
                    .session
                    .snapshot()
                    .error
                    .unwrap_or_else(|| e.to_string());
                Err(anyhow::anyhow!(message))
            }
        }
    }

    pub async fn register(&mut self) -> Result<()> {
        self.restore_session().await;

        let email = prompt("Email: ")?;
        let first_name = prompt("First name (optional): ")?;
        let last_name = prompt("Last name (optional): ")?;
        let role = match prompt("Role [student/educator]: ")?.to_ascii_lowercase().as_str() {
            "" | "student" => Role::Student,
            "educator" => Role::Educator,
            other => return Err(anyhow::anyhow!("Unsupported role: {}", other)),
        };
        let password = prompt_password()?;

        let registration = Registration {
            email: email.clone(),
            password,
            first_name: Some(first_name).filter(|s| !s.is_empty()),
            last_name: Some(last_name).filter(|s| !s.is_empty()),
            role,
        };

        match self.session.register(&registration).await {
            Ok(user) => {
                self.remember_email(&email);
                println!("Account created for {}.", user.display_name());
                if user.is_pending_educator() {
                    println!("Educator accounts need admin approval before publishing content.");
                }
                Ok(())
            }
            Err(e) => {
                let message = self
                    .session
                    .snapshot()
                    .error
                    .unwrap_or_else(|| e.to_string());
                Err(anyhow::anyhow!(message))
            }
        }
    }

    pub async fn logout(&self) -> Result<()> {
        self.restore_session().await;
        self.session.logout().await;
        println!("Signed out.");
        Ok(())
    }

    pub async fn status(&self) -> Result<()> {
        let snapshot = self.restore_session().await;
        match (snapshot.phase, snapshot.user) {
            (SessionPhase::Authenticated, Some(user)) => {
                println!("Signed in as {} <{}>", user.display_name(), user.email);
                println!("Role: {}", user.role);
                if user.is_pending_educator() {
                    println!("Approval: pending");
                }
            }
            _ => println!("Not signed in."),
        }
        if let Some(error) = snapshot.error {
            println!("Last error: {}", error);
        }
        Ok(())
    }

    pub async fn programs(&self) -> Result<()> {
        self.restore_session().await;
        if !self.guard(&RouteGuard::authenticated(), "/programs") {
            return Ok(());
        }

        let programs = self
            .session
            .client()
            .fetch_programs()
            .await
            .context("Failed to fetch programs")?;

        if programs.is_empty() {
            println!("No programs available.");
        }
        for program in programs {
            let marker = if program.is_enrolled { "*" } else { " " };
            println!(
                "{} {:>4}  {}  ({})",
                marker,
                program.id,
                program.title,
                program.difficulty_display()
            );
        }
        Ok(())
    }

    pub async fn dashboard(&self) -> Result<()> {
        self.restore_session().await;
        if !self.guard(&RouteGuard::authenticated(), "/dashboard") {
            return Ok(());
        }

        let client = self.session.client();
        let (dashboard, progress) =
            futures::join!(client.fetch_dashboard(), client.fetch_progress());

        let dashboard = dashboard.context("Failed to fetch dashboard")?;
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
        match progress {
            Ok(progress) => println!("{}", serde_json::to_string_pretty(&progress)?),
            Err(e) => warn!(error = %e, "Failed to fetch progress"),
        }
        Ok(())
    }

    pub async fn approve(&self, user_id: i64) -> Result<()> {
        self.restore_session().await;
        if !self.guard(&RouteGuard::admin(), "/admin/educators") {
            return Ok(());
        }

        self.session
            .client()
            .approve_educator(user_id)
            .await
            .with_context(|| format!("Failed to approve educator {}", user_id))?;
        println!("Educator {} approved.", user_id);
        Ok(())
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

fn prompt_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")?;
    Ok(password)
}
