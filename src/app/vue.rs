// src/app/vue.rs
//
// Vue (UI egui) : natif + web
// ---------------------------
// Objectifs :
// - Formule affichée en étiquettes (clic = sélection, ✎ = renommer, ✕ = retirer)
// - Saisie libre : un opérateur tapé termine le jeton en cours
// - Clavier (champ focus) : Enter valide, Tab prend la 1re suggestion,
//   Backspace sur champ vide retire la dernière étiquette
// - Les actions sont collectées pendant le dessin puis appliquées après
//   (l’éditeur est emprunté en lecture pendant le rendu)

use eframe::egui;

use crate::noyau::format::format_resultat;
use crate::noyau::jetons::{Jeton, Operateur};
use crate::noyau::suggestions::Suggestion;
use crate::noyau::Action;

use super::etat::AppFormule;

const ID_ENTREE: &str = "entree_formule";
const ID_RENOMMAGE: &str = "renommage_etiquette";

impl AppFormule {
    /// UI principale : à appeler depuis eframe::App::update(...)
    pub fn ui(&mut self, ui: &mut egui::Ui) {
        ui.spacing_mut().item_spacing = egui::vec2(6.0, 6.0);

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.heading("Formule à étiquettes");
                ui.add_space(6.0);

                let mut actions = Vec::new();
                self.ui_etiquettes(ui, &mut actions);
                ui.add_space(6.0);
                self.ui_entree(ui, &mut actions);
                self.ui_suggestions(ui, &mut actions);

                for a in actions {
                    self.appliquer(a);
                }

                ui.add_space(8.0);
                ui.separator();
                ui.add_space(8.0);

                self.ui_resultat(ui);

                ui.add_space(8.0);
                ui.separator();
                ui.add_space(8.0);

                self.ui_demarche(ui);
            });
    }

    /* ------------------------ Étiquettes ------------------------ */

    fn ui_etiquettes(&self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        let session = self.editeur.session();

        egui::Frame::group(ui.style())
            .fill(ui.visuals().extreme_bg_color)
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.horizontal_wrapped(|ui| {
                    if self.editeur.sequence().is_empty() {
                        ui.weak("(formule vide)");
                    }
                    for (index, jeton) in self.editeur.sequence().iter().enumerate() {
                        if session.renommage == Some(index) {
                            Self::champ_renommage(ui, &session.texte_renommage, actions);
                        } else {
                            self.etiquette(ui, index, jeton, actions);
                        }
                    }
                });
            });

        match self.editeur.evaluer() {
            Ok(v) => ui.weak(format!("= {}", format_resultat(v))),
            Err(e) => ui.weak(format!("incomplète : {e}")),
        };

        if let Some(index) = session.selection {
            self.menu_remplacer(ui, index, actions);
        }
    }

    fn etiquette(
        &self,
        ui: &mut egui::Ui,
        index: usize,
        jeton: &Jeton,
        actions: &mut Vec<Action>,
    ) {
        if let Jeton::Operateur(op) = jeton {
            ui.monospace(op.symbole().to_string());
            return;
        }

        let choisi = self.editeur.session().selection == Some(index);
        let resp = ui
            .selectable_label(choisi, jeton.libelle())
            .on_hover_text(Self::info_jeton(jeton));

        if resp.double_clicked() {
            actions.push(Action::CommencerRenommage(index));
        } else if resp.clicked() {
            actions.push(Action::SelectionnerJeton(index));
        }

        if ui.small_button("✎").on_hover_text("Renommer").clicked() {
            actions.push(Action::CommencerRenommage(index));
        }
        if ui.small_button("✕").on_hover_text("Retirer").clicked() {
            actions.push(Action::RetirerJeton(index));
        }
    }

    fn info_jeton(jeton: &Jeton) -> String {
        let valeur = jeton.valeur().unwrap_or_default();
        match jeton {
            Jeton::Variable { categorie, .. } => format!(
                "{} : {valeur}\nid {}",
                categorie.as_deref().unwrap_or("variable"),
                jeton.id().unwrap_or("?")
            ),
            Jeton::Nombre { .. } => format!("nombre : {valeur}"),
            Jeton::Operateur(op) => format!("opérateur {}", op.symbole()),
        }
    }

    fn champ_renommage(ui: &mut egui::Ui, texte: &str, actions: &mut Vec<Action>) {
        let mut t = texte.to_string();
        let largeur = 12.0 * t.chars().count().max(6) as f32;
        let resp = ui.add(
            egui::TextEdit::singleline(&mut t)
                .id_salt(ID_RENOMMAGE)
                .desired_width(largeur),
        );

        if !resp.has_focus() && !resp.lost_focus() {
            resp.request_focus();
        }
        if resp.changed() {
            actions.push(Action::SaisirRenommage(t));
        }

        let (enter, escape) = ui.input(|i| {
            (
                i.key_pressed(egui::Key::Enter),
                i.key_pressed(egui::Key::Escape),
            )
        });
        if resp.lost_focus() {
            if escape {
                actions.push(Action::AnnulerRenommage);
            } else if enter {
                actions.push(Action::TerminerRenommage);
            } else {
                actions.push(Action::ClicExterieur);
            }
        }
    }

    fn menu_remplacer(&self, ui: &mut egui::Ui, index: usize, actions: &mut Vec<Action>) {
        let candidats = self.editeur.candidats_bruts();
        ui.horizontal_wrapped(|ui| {
            ui.label("Remplacer par :");
            if candidats.is_empty() {
                ui.weak("aucune suggestion (tapez pour en obtenir)");
            } else {
                ui.weak(format!("« {} »", self.editeur.texte_candidats()));
            }
            for s in candidats.iter().take(self.max_suggestions) {
                if ui.button(s.nom.as_str()).clicked() {
                    actions.push(Action::RemplacerParSuggestion {
                        index,
                        suggestion: s.clone(),
                    });
                }
            }
        });
    }

    /* ------------------------ Saisie ------------------------ */

    fn ui_entree(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        ui.label("Entrée :");

        let id = egui::Id::new(ID_ENTREE);
        let avant = self.editeur.session().entree.clone();
        let avait_focus = ui.memory(|m| m.has_focus(id));

        // Tab consommé avant le champ : il ne doit pas déplacer le focus.
        let tab = avait_focus
            && ui.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Tab));
        let backspace = ui.input(|i| i.key_pressed(egui::Key::Backspace));
        let enter = ui.input(|i| i.key_pressed(egui::Key::Enter));

        let mut texte = avant.clone();
        let resp = ui.add(
            egui::TextEdit::singleline(&mut texte)
                .id(id)
                .desired_width(ui.available_width())
                .hint_text("Ex: Revenue - Cost * 0.2, puis =")
                .code_editor(),
        );

        if self.focus_entree && self.editeur.session().renommage.is_none() {
            resp.request_focus();
            self.focus_entree = false;
        }

        if resp.changed() {
            Self::decouper_saisie(&texte, actions);
        }

        let actif = resp.has_focus() || resp.lost_focus();
        if actif && backspace && avant.is_empty() {
            actions.push(Action::Effacer);
        }
        if tab {
            actions.push(Action::AccepterSuggestion);
        }
        if actif && enter {
            // Enter sur champ vide : évaluer la formule
            actions.push(if texte.trim().is_empty() {
                Action::Evaluer
            } else {
                Action::Valider
            });
        }

        ui.add_space(6.0);

        ui.horizontal_wrapped(|ui| {
            for op in Operateur::TOUS {
                let c = op.symbole();
                if ui.add_sized([36.0, 28.0], egui::Button::new(c.to_string())).clicked() {
                    actions.push(Action::Operateur(c));
                }
            }

            ui.separator();

            Self::bouton_action(
                ui,
                "⌫",
                "Retire la dernière étiquette",
                Action::Effacer,
                actions,
            );
            Self::bouton_action(ui, "AC", "Vide la formule", Action::Vider, actions);

            ui.add_space(10.0);

            let eq = ui.add_sized([64.0, 32.0], egui::Button::new("="));
            if eq.clicked() {
                actions.push(Action::Evaluer);
            }
        });
    }

    /// Texte du champ -> actions : chaque opérateur tapé (ou collé) coupe le texte,
    /// "=" évalue, le reste devient le nouveau contenu du champ.
    fn decouper_saisie(texte: &str, actions: &mut Vec<Action>) {
        let mut courant = String::new();
        let mut coupe = false;

        for c in texte.chars() {
            if c == '\t' {
                continue;
            }
            if c == '=' {
                actions.push(Action::Saisir(std::mem::take(&mut courant)));
                actions.push(Action::Evaluer);
                coupe = true;
            } else if Operateur::depuis_char(c).is_some() {
                actions.push(Action::Saisir(std::mem::take(&mut courant)));
                actions.push(Action::Operateur(c));
                coupe = true;
            } else {
                courant.push(c);
            }
        }

        if !coupe || !courant.is_empty() {
            actions.push(Action::Saisir(courant));
        }
    }

    fn ui_suggestions(&self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        if self.editeur.session().entree.trim().is_empty() {
            return;
        }

        let candidats = self.editeur.candidats();
        if candidats.is_empty() {
            if self.editeur.suggestions_en_attente() {
                ui.weak("recherche…");
            }
            return;
        }

        for (rang, s) in candidats.into_iter().take(self.max_suggestions).enumerate() {
            let resp = ui.horizontal(|ui| {
                let r = ui.selectable_label(rang == 0, s.nom.as_str());
                if !s.categorie.is_empty() {
                    ui.weak(s.categorie.as_str());
                }
                r
            });
            let r = resp.inner;
            let r = if rang == 0 { r.on_hover_text("Tab") } else { r };
            if r.clicked() {
                actions.push(Action::ChoisirSuggestion(Suggestion::clone(s)));
            }
        }
    }

    fn bouton_action(
        ui: &mut egui::Ui,
        label: &str,
        tip: &str,
        action: Action,
        actions: &mut Vec<Action>,
    ) {
        let resp = ui
            .add_sized([44.0, 28.0], egui::Button::new(label))
            .on_hover_text(tip);
        if resp.clicked() {
            actions.push(action);
        }
    }

    /* ------------------------ Sorties ------------------------ */

    fn ui_resultat(&self, ui: &mut egui::Ui) {
        ui.label("Résultat :");
        Self::champ_monospace(ui, "resultat_out", &self.resultat, 1);

        if !self.erreur.is_empty() {
            ui.add_space(6.0);
            ui.colored_label(ui.visuals().error_fg_color, self.erreur.as_str());
        }
        if !self.avertissement.is_empty() {
            ui.add_space(6.0);
            ui.colored_label(ui.visuals().warn_fg_color, self.avertissement.as_str());
        }
    }

    fn ui_demarche(&self, ui: &mut egui::Ui) {
        egui::CollapsingHeader::new("Démarche")
            .default_open(false)
            .show(ui, |ui| {
                Self::champ_demarche(ui, "Jetons", "demarche_jetons", &self.demarche.jetons);
                Self::champ_demarche(ui, "RPN", "demarche_rpn", &self.demarche.rpn);
            });
    }

    fn champ_demarche(ui: &mut egui::Ui, titre: &str, id: &str, contenu: &str) {
        ui.add_space(4.0);
        ui.label(format!("{titre} :"));
        Self::champ_monospace(ui, id, contenu, 2);
    }

    fn champ_monospace(ui: &mut egui::Ui, id: &str, contenu: &str, rows: usize) {
        egui::Frame::group(ui.style())
            .fill(ui.visuals().extreme_bg_color)
            .show(ui, |ui| {
                ui.push_id(id, |ui| {
                    ui.set_min_width(ui.available_width());
                    ui.set_min_height(
                        rows as f32 * ui.text_style_height(&egui::TextStyle::Monospace),
                    );
                    ui.monospace(contenu);
                });
            });
    }
}
