use std::{collections::BTreeMap, sync::Arc};

use shared::domain::{OrganizationBranding, OrganizationId};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::ApiClient;

pub const FONT_FAMILY_VARIABLE: &str = "--font-family";

/// Anything that can hold CSS custom properties for the active theme.
pub trait ThemeTarget: Send {
    fn set_variable(&mut self, name: &str, value: &str);
    fn remove_variable(&mut self, name: &str);
    fn set_custom_css(&mut self, css: Option<&str>);
    fn set_favicon(&mut self, href: Option<&str>);
}

/// In-memory document root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeDocument {
    pub variables: BTreeMap<String, String>,
    pub custom_css: Option<String>,
    pub favicon: Option<String>,
}

impl ThemeDocument {
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Renders the variables as a `:root` block followed by any custom CSS.
    pub fn to_css(&self) -> String {
        let mut css = String::from(":root {\n");
        for (name, value) in &self.variables {
            css.push_str(&format!("  {name}: {value};\n"));
        }
        css.push_str("}\n");
        if let Some(custom) = &self.custom_css {
            css.push_str(custom);
            if !custom.ends_with('\n') {
                css.push('\n');
            }
        }
        css
    }
}

impl ThemeTarget for ThemeDocument {
    fn set_variable(&mut self, name: &str, value: &str) {
        self.variables.insert(name.to_string(), value.to_string());
    }

    fn remove_variable(&mut self, name: &str) {
        self.variables.remove(name);
    }

    fn set_custom_css(&mut self, css: Option<&str>) {
        self.custom_css = css.map(str::to_string);
    }

    fn set_favicon(&mut self, href: Option<&str>) {
        self.favicon = href.map(str::to_string);
    }
}

fn color_variables(branding: &OrganizationBranding) -> [(&'static str, &str); 11] {
    [
        ("--color-primary", branding.primary_color.as_str()),
        ("--color-secondary", branding.secondary_color.as_str()),
        ("--color-accent", branding.accent_color.as_str()),
        ("--color-background", branding.background_color.as_str()),
        ("--color-surface", branding.surface_color.as_str()),
        ("--color-text", branding.text_color.as_str()),
        ("--color-text-secondary", branding.text_secondary_color.as_str()),
        ("--color-border", branding.border_color.as_str()),
        ("--color-success", branding.success_color.as_str()),
        ("--color-warning", branding.warning_color.as_str()),
        ("--color-error", branding.error_color.as_str()),
    ]
}

pub fn apply_branding(target: &mut dyn ThemeTarget, branding: &OrganizationBranding) {
    for (name, value) in color_variables(branding) {
        target.set_variable(name, value);
    }
    match branding.font_family.as_deref() {
        Some(font) => target.set_variable(FONT_FAMILY_VARIABLE, font),
        None => target.remove_variable(FONT_FAMILY_VARIABLE),
    }
    target.set_custom_css(branding.custom_css.as_deref());
    target.set_favicon(branding.favicon_url.as_deref());
}

/// Back to the stock theme with every injected extra stripped.
pub fn reset_branding(target: &mut dyn ThemeTarget) {
    apply_branding(target, &OrganizationBranding::default());
}

pub struct BrandingStore<T: ThemeTarget> {
    api: Arc<ApiClient>,
    target: Mutex<T>,
    current: Mutex<OrganizationBranding>,
}

impl<T: ThemeTarget> BrandingStore<T> {
    pub fn new(api: Arc<ApiClient>, target: T) -> Self {
        Self {
            api,
            target: Mutex::new(target),
            current: Mutex::new(OrganizationBranding::default()),
        }
    }

    pub async fn current(&self) -> OrganizationBranding {
        self.current.lock().await.clone()
    }

    pub async fn inspect<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.target.lock().await)
    }

    /// Fetches and applies the organization's theme. Any failure applies
    /// the defaults instead.
    pub async fn load_branding(&self, org_id: &OrganizationId) -> OrganizationBranding {
        let path = format!("/organizations/{org_id}/branding");
        let branding = match self.api.get::<OrganizationBranding>(&path).await {
            Ok(branding) => {
                info!("branding: loaded organization={org_id}");
                branding
            }
            Err(err) => {
                warn!("branding: falling back to defaults organization={org_id} error={err}");
                OrganizationBranding::default()
            }
        };
        self.apply(branding.clone()).await;
        branding
    }

    pub async fn apply(&self, branding: OrganizationBranding) {
        apply_branding(&mut *self.target.lock().await, &branding);
        *self.current.lock().await = branding;
    }

    pub async fn reset(&self) {
        reset_branding(&mut *self.target.lock().await);
        *self.current.lock().await = OrganizationBranding::default();
    }
}

#[cfg(test)]
#[path = "tests/branding_tests.rs"]
mod tests;
