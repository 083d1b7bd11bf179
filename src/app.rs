// src/app.rs
//
// Formule à étiquettes — module App (racine)
// -----------------------------------------
// Rôle:
// - Déclarer les sous-modules (etat.rs + vue.rs)
// - Ré-exporter AppFormule (pour main.rs: use crate::app::AppFormule;)
// - Fournir l’impl eframe::App (compatible NATIF + WEB)
//
// Important:
// - Enter/Tab/Backspace sont gérés dans vue.rs (quand le champ a le focus).
// - Les suggestions arrivent hors du fil UI : on les récolte à chaque frame.

pub mod etat;
pub mod vue;

pub use etat::AppFormule;

use std::time::Duration;

use eframe::egui;

use crate::noyau::Action;

/// Cadence de rafraîchissement tant qu’une recherche est en cours.
const ATTENTE_SUGGESTIONS: Duration = Duration::from_millis(50);

impl eframe::App for AppFormule {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.recolter();
        if self.editeur.suggestions_en_attente() {
            ctx.request_repaint_after(ATTENTE_SUGGESTIONS);
        }

        // ESC : annule un renommage, sinon efface seulement l’entrée.
        let esc = ctx.input(|i| i.key_pressed(egui::Key::Escape));
        if esc {
            if self.editeur.session().renommage.is_some() {
                self.appliquer(Action::AnnulerRenommage);
            } else {
                self.appliquer(Action::Saisir(String::new()));
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.ui(ui);
        });
    }
}
