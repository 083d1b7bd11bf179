//! Configuration utilisateur
//!
//! Fichier : `~/.config/formule-etiquettes/config.yaml`
//! (`$XDG_CONFIG_HOME/formule-etiquettes/` si défini, `%APPDATA%\formule-etiquettes\` sous Windows).
//!
//! Tous les champs ont une valeur par défaut : un fichier absent, partiel ou
//! illisible ne bloque jamais le démarrage.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::noyau::suggestions::Suggestion;

const APP_DIR: &str = "formule-etiquettes";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFormule {
    /// Échéance d’une recherche de suggestions.
    #[serde(default = "delai_defaut")]
    pub delai_suggestions_ms: u64,

    /// Nombre de suggestions affichées sous le champ.
    #[serde(default = "max_suggestions_defaut")]
    pub max_suggestions: usize,

    /// Enregistrer la formule à chaque modification.
    #[serde(default = "vrai")]
    pub persistance: bool,

    /// Remplace `formule.json` dans le dossier de configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fichier_formule: Option<PathBuf>,

    /// Catalogue de variables proposées à la saisie.
    #[serde(default = "variables_defaut")]
    pub variables: Vec<Suggestion>,
}

fn delai_defaut() -> u64 {
    800
}

fn max_suggestions_defaut() -> usize {
    7
}

fn vrai() -> bool {
    true
}

fn variables_defaut() -> Vec<Suggestion> {
    vec![
        Suggestion::new("revenue", "Revenue", "finance", 0.0),
        Suggestion::new("cost", "Cost", "finance", 0.0),
        Suggestion::new("tax_rate", "Tax rate", "finance", 0.0),
        Suggestion::new("headcount", "Headcount", "people", 0.0),
    ]
}

impl Default for ConfigFormule {
    fn default() -> Self {
        Self {
            delai_suggestions_ms: delai_defaut(),
            max_suggestions: max_suggestions_defaut(),
            persistance: vrai(),
            fichier_formule: None,
            variables: variables_defaut(),
        }
    }
}

impl ConfigFormule {
    /// Charge depuis le dossier de configuration, ou renvoie les valeurs par défaut.
    pub fn load() -> Self {
        let Some(path) = config_file() else {
            tracing::debug!("Pas de dossier de configuration, valeurs par défaut");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!(
                "Configuration absente ({}), valeurs par défaut",
                path.display()
            );
            return Self::default();
        }

        match Self::charger_depuis(&path) {
            Ok(config) => {
                tracing::info!("Configuration chargée depuis {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("{e}");
                Self::default()
            }
        }
    }

    pub fn charger_depuis(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Lecture de la configuration {}: {}", path.display(), e))?;
        serde_yaml::from_str(&content)
            .map_err(|e| format!("Configuration invalide {}: {}", path.display(), e))
    }

    pub fn delai_suggestions(&self) -> Duration {
        Duration::from_millis(self.delai_suggestions_ms)
    }

    /// Fichier de la formule : celui de la config, sinon `formule.json` du dossier de config.
    pub fn chemin_formule(&self) -> Option<PathBuf> {
        self.fichier_formule
            .clone()
            .or_else(|| config_dir().map(|dir| dir.join("formule.json")))
    }
}

/* ------------------------ Chemins ------------------------ */

/// Dossier de configuration de l’application.
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join(APP_DIR))
    }

    #[cfg(not(target_os = "windows"))]
    {
        env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .map(|config| config.join(APP_DIR))
    }
}

/// `…/formule-etiquettes/config.yaml`
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.yaml"))
}

/// `…/formule-etiquettes/logs/` (créé si besoin)
pub fn ensure_logs_dir() -> std::io::Result<PathBuf> {
    let dir = config_dir().map(|d| d.join("logs")).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "pas de dossier de configuration",
        )
    })?;
    fs::create_dir_all(&dir)?;
    Ok(dir)
}
