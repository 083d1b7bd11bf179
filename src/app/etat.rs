//! src/app/etat.rs
//!
//! État UI : l’éditeur du noyau + ce qu’on affiche de ses effets.
//!
//! Rôle : construire l’éditeur depuis la configuration (catalogue, délai,
//! stockage), lui transmettre les actions, et ranger les effets en textes prêts
//! à afficher (résultat, erreur, avertissement, démarche).
//!
//! Contrats :
//! - Aucune évaluation ici : tout passe par `Editeur::appliquer`.
//! - Une erreur d’évaluation CONSERVE le dernier résultat affiché.
//! - Un avertissement (persistance) n’interrompt jamais l’édition.

use std::sync::Arc;

use crate::config::ConfigFormule;
use crate::noyau::eval::Demarche;
use crate::noyau::format::format_resultat;
use crate::noyau::persistance::Stockage;
use crate::noyau::suggestions::{Catalogue, RechercheSuggestions, Recolte};
use crate::noyau::{Action, Editeur, Effet, ErreurFormule};

pub struct AppFormule {
    pub editeur: Editeur,

    // --- sorties ---
    pub resultat: String,
    pub erreur: String,
    pub avertissement: String,

    // --- démarche (panneau d’explication) ---
    pub demarche: Demarche,

    // --- paramètres ---
    pub max_suggestions: usize,

    // --- UX ---
    pub focus_entree: bool,
}

impl Default for AppFormule {
    fn default() -> Self {
        Self::depuis_config(&ConfigFormule::default())
    }
}

impl AppFormule {
    pub fn depuis_config(config: &ConfigFormule) -> Self {
        let source = Arc::new(Catalogue::new(config.variables.clone()));
        let recherche = RechercheSuggestions::new(source, config.delai_suggestions());

        let mut editeur = Editeur::new().avec_suggestions(recherche);
        if let Some(stockage) = stockage(config) {
            editeur = editeur.avec_stockage(stockage);
        }

        let mut app = Self {
            editeur,
            resultat: String::new(),
            erreur: String::new(),
            avertissement: String::new(),
            demarche: Demarche::default(),
            max_suggestions: config.max_suggestions,
            focus_entree: true,
        };

        if let Some(e) = app.editeur.charger() {
            tracing::warn!("formule enregistrée illisible: {e}");
            app.set_avertissement(&e);
        }
        app
    }

    /* ------------------------ Actions ------------------------ */

    /// Transmet l’action à l’éditeur puis dépose ses effets dans l’état UI.
    pub fn appliquer(&mut self, action: Action) {
        if action == Action::Vider {
            self.clear_resultats();
        }
        match self.editeur.appliquer(action) {
            Ok(effets) => {
                for effet in effets {
                    self.absorber(effet);
                }
            }
            Err(e) => self.set_erreur(e.to_string()),
        }
        self.focus_entree = true;
    }

    /// À chaque frame : intègre les suggestions arrivées entre-temps.
    pub fn recolter(&mut self) {
        if let Recolte::Indisponible(e) = self.editeur.recolter_suggestions() {
            tracing::debug!("suggestions indisponibles: {e}");
        }
    }

    fn absorber(&mut self, effet: Effet) {
        match effet {
            Effet::Resultat { valeur, demarche } => {
                self.set_resultat(format_resultat(valeur), demarche)
            }
            Effet::EchecEvaluation(e) => self.set_erreur(e.to_string()),
            Effet::Avertissement(e) => self.set_avertissement(&e),
        }
    }

    /* ------------------------ Sorties ------------------------ */

    /// Efface résultat + erreur + démarche (la formule reste).
    pub fn clear_resultats(&mut self) {
        self.resultat.clear();
        self.erreur.clear();
        self.demarche = Demarche::default();
        self.focus_entree = true;
    }

    pub fn set_erreur(&mut self, msg: impl Into<String>) {
        self.erreur = msg.into();
        self.demarche = Demarche::default();
    }

    pub fn set_resultat(&mut self, resultat: impl Into<String>, demarche: Demarche) {
        self.erreur.clear();
        self.resultat = resultat.into();
        self.demarche = demarche;
    }

    fn set_avertissement(&mut self, e: &ErreurFormule) {
        self.avertissement = e.to_string();
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn stockage(config: &ConfigFormule) -> Option<Box<dyn Stockage>> {
    use crate::noyau::persistance::StockageFichier;

    if !config.persistance {
        return None;
    }
    match config.chemin_formule() {
        Some(chemin) => {
            tracing::info!("formule enregistrée dans {}", chemin.display());
            Some(Box::new(StockageFichier::new(chemin)))
        }
        None => {
            tracing::warn!("pas de dossier de configuration, formule non enregistrée");
            None
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn stockage(config: &ConfigFormule) -> Option<Box<dyn Stockage>> {
    use crate::noyau::persistance::StockageMemoire;

    config
        .persistance
        .then(|| Box::new(StockageMemoire::new()) as Box<dyn Stockage>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noyau::suggestions::Suggestion;

    fn app() -> AppFormule {
        AppFormule::depuis_config(&ConfigFormule {
            persistance: false,
            ..Default::default()
        })
    }

    fn saisir(app: &mut AppFormule, actions: &[Action]) {
        for a in actions {
            app.appliquer(a.clone());
        }
    }

    #[test]
    fn resultat_et_demarche() {
        let mut app = app();
        saisir(
            &mut app,
            &[
                Action::Saisir("5".into()),
                Action::Operateur('+'),
                Action::Saisir("3".into()),
                Action::Operateur('*'),
                Action::Saisir("2".into()),
                Action::Valider,
                Action::Evaluer,
            ],
        );
        assert_eq!(app.resultat, "11");
        assert!(app.erreur.is_empty());
        assert_eq!(app.demarche.rpn, "5 3 2 * +");
    }

    #[test]
    fn erreur_garde_le_dernier_resultat() {
        let mut app = app();
        saisir(
            &mut app,
            &[Action::Saisir("2".into()), Action::Valider, Action::Evaluer],
        );
        assert_eq!(app.resultat, "2");

        saisir(&mut app, &[Action::Operateur('+'), Action::Evaluer]);
        assert_eq!(app.resultat, "2");
        assert!(!app.erreur.is_empty());
        assert_eq!(app.demarche, Demarche::default());
    }

    #[test]
    fn index_hors_bornes_affiche_une_erreur() {
        let mut app = app();
        app.appliquer(Action::RetirerJeton(4));
        assert!(!app.erreur.is_empty());
        assert!(app.editeur.sequence().is_empty());
    }

    #[test]
    fn suggestion_du_catalogue() {
        let mut app = app();
        app.appliquer(Action::ChoisirSuggestion(Suggestion::new(
            "revenue", "Revenue", "finance", 0.0,
        )));
        assert_eq!(app.editeur.sequence().len(), 1);
        assert_eq!(app.max_suggestions, 7);
    }

    #[test]
    fn formule_rechargee_au_demarrage() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigFormule {
            fichier_formule: Some(dir.path().join("formule.json")),
            ..Default::default()
        };

        let mut app = AppFormule::depuis_config(&config);
        saisir(
            &mut app,
            &[Action::Saisir("4".into()), Action::Valider],
        );

        let mut relu = AppFormule::depuis_config(&config);
        assert_eq!(relu.editeur.sequence().len(), 1);
        relu.appliquer(Action::Evaluer);
        assert_eq!(relu.resultat, "4");
    }

    #[test]
    fn formule_illisible_devient_avertissement() {
        let dir = tempfile::tempdir().unwrap();
        let chemin = dir.path().join("formule.json");
        std::fs::write(&chemin, "{").unwrap();

        let app = AppFormule::depuis_config(&ConfigFormule {
            fichier_formule: Some(chemin),
            ..Default::default()
        });
        assert!(!app.avertissement.is_empty());
        assert!(app.editeur.sequence().is_empty());
    }
}
