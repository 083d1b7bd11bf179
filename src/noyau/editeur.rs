//! src/noyau/editeur.rs
//!
//! Éditeur de séquence : API de mutation + politique clavier.
//!
//! Rôle : posséder la séquence et la session d’édition, et transformer chaque
//! action (touche, clic) en mutation + effets, sans rien savoir de l’UI.
//!
//! Contrats :
//! - Un seul écrivain (`&mut self`) : append / remove_at / replace_at ne sont pas
//!   atomiques entre eux vis-à-vis des décalages d’index.
//! - Toute mutation est suivie d’un enregistrement explicite (si un stockage est branché).
//!   Un échec d’enregistrement devient un avertissement, jamais une annulation.
//! - Les index de sélection/renommage suivent les décalages de la séquence.

use super::erreurs::{ErreurFormule, ErreurSyntaxe, Resultat};
use super::eval::{eval_avec_demarche, eval_sequence, Demarche};
use super::jetons::{lire_nombre, Jeton, Operateur, Sequence};
use super::persistance::Stockage;
use super::suggestions::{
    filtrer, meilleure_correspondance, RechercheSuggestions, Recolte, Suggestion,
};

/// État transitoire (jamais persisté).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionEdition {
    /// Texte libre en cours de saisie.
    pub entree: String,
    /// Jeton choisi pour remplacement (menu “Remplacer par”).
    pub selection: Option<usize>,
    /// Jeton en cours de renommage.
    pub renommage: Option<usize>,
    pub texte_renommage: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Nouveau contenu du champ de saisie.
    Saisir(String),
    /// Retour arrière.
    Effacer,
    /// Caractère tapé ; ignoré si ce n’est pas un des 7 opérateurs.
    Operateur(char),
    /// Entrée.
    Valider,
    /// Tab : prendre la première suggestion.
    AccepterSuggestion,
    /// Clic sur une suggestion de la liste.
    ChoisirSuggestion(Suggestion),
    /// "=".
    Evaluer,

    SelectionnerJeton(usize),
    RemplacerParSuggestion {
        index: usize,
        suggestion: Suggestion,
    },
    RetirerJeton(usize),

    CommencerRenommage(usize),
    SaisirRenommage(String),
    TerminerRenommage,
    AnnulerRenommage,
    /// Clic hors du champ de renommage : équivaut à terminer.
    ClicExterieur,

    Vider,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effet {
    Resultat { valeur: f64, demarche: Demarche },
    EchecEvaluation(ErreurSyntaxe),
    /// Non fatal (persistance) : l’édition a bien eu lieu.
    Avertissement(ErreurFormule),
}

#[derive(Default)]
pub struct Editeur {
    sequence: Sequence,
    session: SessionEdition,
    recherche: Option<RechercheSuggestions>,
    stockage: Option<Box<dyn Stockage>>,
    avertissements: Vec<ErreurFormule>,
}

impl Editeur {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn avec_suggestions(mut self, recherche: RechercheSuggestions) -> Self {
        self.recherche = Some(recherche);
        self
    }

    pub fn avec_stockage(mut self, stockage: Box<dyn Stockage>) -> Self {
        self.stockage = Some(stockage);
        self
    }

    /* ------------------------ Lecture ------------------------ */

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn session(&self) -> &SessionEdition {
        &self.session
    }

    /// Candidats courants filtrés par le texte saisi (sous-chaîne, casse ignorée).
    pub fn candidats(&self) -> Vec<&Suggestion> {
        match &self.recherche {
            Some(r) => filtrer(r.candidats(), &self.session.entree),
            None => Vec::new(),
        }
    }

    /// Tous les derniers candidats reçus, sans filtre (menu “Remplacer par”).
    pub fn candidats_bruts(&self) -> &[Suggestion] {
        self.recherche
            .as_ref()
            .map(RechercheSuggestions::candidats)
            .unwrap_or(&[])
    }

    /// Texte pour lequel les candidats bruts ont été obtenus.
    pub fn texte_candidats(&self) -> &str {
        self.recherche
            .as_ref()
            .map(RechercheSuggestions::texte_candidats)
            .unwrap_or("")
    }

    pub fn evaluer(&self) -> Result<f64, ErreurSyntaxe> {
        eval_sequence(self.sequence.jetons())
    }

    /// Avertissements accumulés depuis le dernier appel.
    pub fn prendre_avertissements(&mut self) -> Vec<ErreurFormule> {
        std::mem::take(&mut self.avertissements)
    }

    /* ------------------------ Stockage ------------------------ */

    /// Recharge la séquence enregistrée. En cas d’échec, la séquence en mémoire
    /// est gardée telle quelle et l’erreur est renvoyée comme avertissement.
    pub fn charger(&mut self) -> Option<ErreurFormule> {
        let st = self.stockage.as_ref()?;
        match st.load() {
            Ok(Some(jetons)) => {
                tracing::info!(n = jetons.len(), "séquence rechargée");
                self.sequence = Sequence::from(jetons);
                self.session.selection = None;
                self.session.renommage = None;
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(erreur = %e, "rechargement impossible, séquence en mémoire conservée");
                Some(e)
            }
        }
    }

    fn persister(&mut self) {
        let Some(st) = self.stockage.as_mut() else {
            return;
        };
        if let Err(e) = st.save(self.sequence.jetons()) {
            tracing::warn!(erreur = %e, "enregistrement impossible");
            self.avertissements.push(e);
        }
    }

    /* ------------------------ Mutations ------------------------ */

    pub fn append(&mut self, jeton: Jeton) {
        tracing::debug!(jeton = %jeton.libelle(), "ajout");
        self.sequence.append(jeton);
        self.persister();
    }

    pub fn remove_at(&mut self, index: usize) -> Resultat<Jeton> {
        let retire = self.sequence.remove_at(index)?;
        tracing::debug!(index, jeton = %retire.libelle(), "retrait");

        self.session.selection = decaler(self.session.selection, index);
        let renomme = self.session.renommage;
        self.session.renommage = decaler(renomme, index);
        if renomme.is_some() && self.session.renommage.is_none() {
            self.session.texte_renommage.clear();
        }

        self.persister();
        Ok(retire)
    }

    pub fn replace_at(&mut self, index: usize, jeton: Jeton) -> Resultat<Jeton> {
        let ancien = self.sequence.replace_at(index, jeton)?;
        tracing::debug!(index, ancien = %ancien.libelle(), "remplacement");
        self.persister();
        Ok(ancien)
    }

    /// Texte libre -> jeton. N’échoue jamais :
    /// nombre décimal fini, sinon meilleure suggestion, sinon variable à 0.
    pub fn resolve_free_text(&self, texte: &str) -> Jeton {
        let t = texte.trim();
        if let Some(v) = lire_nombre(t) {
            return Jeton::nombre(v);
        }
        // un texte vide « contient » tous les noms : pas de recherche
        if t.is_empty() {
            return Jeton::variable(t, 0.0);
        }

        if let Some(r) = &self.recherche {
            match r.rechercher_maintenant(t) {
                Ok(candidats) => {
                    if let Some(s) = meilleure_correspondance(&candidats, t) {
                        return s.en_jeton();
                    }
                }
                Err(e) => {
                    // repli local : branche “pas de correspondance”
                    tracing::warn!(texte = t, erreur = %e, "résolution sans suggestions");
                }
            }
        }

        Jeton::variable(t, 0.0)
    }

    /* ------------------------ Suggestions ------------------------ */

    /// Non bloquant : intègre les réponses arrivées (à appeler à chaque frame).
    pub fn recolter_suggestions(&mut self) -> Recolte {
        match self.recherche.as_mut() {
            Some(r) => r.recolter(),
            None => Recolte::Rien,
        }
    }

    pub fn suggestions_en_attente(&self) -> bool {
        self.recherche
            .as_ref()
            .is_some_and(RechercheSuggestions::en_attente)
    }

    /// Bloquant (borné par le délai de la source).
    #[cfg(test)]
    pub fn attendre_suggestions(&mut self) -> Recolte {
        match self.recherche.as_mut() {
            Some(r) => r.attendre(),
            None => Recolte::Rien,
        }
    }

    /* ------------------------ Actions ------------------------ */

    /// (état, action) -> (nouvel état, effets).
    /// Seules les erreurs d’index sont renvoyées en `Err` ; l’état est alors inchangé.
    pub fn appliquer(&mut self, action: Action) -> Resultat<Vec<Effet>> {
        tracing::trace!(?action, "action");
        let mut effets = Vec::new();

        match action {
            Action::Saisir(texte) => self.saisir(texte),

            Action::Effacer => {
                if self.session.entree.is_empty() && !self.sequence.is_empty() {
                    self.remove_at(self.sequence.len() - 1)?;
                }
            }

            Action::Operateur(c) => {
                if let Some(op) = Operateur::depuis_char(c) {
                    let texte = std::mem::take(&mut self.session.entree);
                    if !texte.trim().is_empty() {
                        let j = self.resolve_free_text(&texte);
                        self.append(j);
                    }
                    self.append(Jeton::Operateur(op));
                    self.vider_entree();
                }
            }

            Action::Valider => {
                self.valider_entree();
            }

            Action::AccepterSuggestion => {
                let premier = self.candidats().first().map(|s| (*s).clone());
                if let Some(s) = premier {
                    self.choisir(&s);
                }
            }

            Action::ChoisirSuggestion(s) => self.choisir(&s),

            Action::Evaluer => {
                self.valider_entree();
                match eval_avec_demarche(self.sequence.jetons()) {
                    Ok((valeur, demarche)) => {
                        tracing::info!(valeur, "formule évaluée");
                        effets.push(Effet::Resultat { valeur, demarche });
                    }
                    Err(e) => {
                        tracing::info!(erreur = %e, "formule invalide");
                        effets.push(Effet::EchecEvaluation(e));
                    }
                }
            }

            Action::SelectionnerJeton(index) => {
                self.verifier_index(index)?;
                if self.session.renommage.is_some_and(|r| r != index) {
                    self.terminer_renommage()?;
                }
                self.session.selection = if self.session.selection == Some(index) {
                    None
                } else {
                    Some(index)
                };
            }

            Action::RemplacerParSuggestion { index, suggestion } => {
                self.replace_at(index, suggestion.en_jeton())?;
                self.session.selection = None;
            }

            Action::RetirerJeton(index) => {
                self.remove_at(index)?;
            }

            Action::CommencerRenommage(index) => {
                let libelle = match self.sequence.get(index) {
                    None => return Err(self.hors_sequence(index)),
                    Some(j) if j.est_operateur() => {
                        tracing::debug!(index, "renommage refusé pour un opérateur");
                        return Ok(effets);
                    }
                    Some(j) => j.libelle(),
                };
                if self.session.renommage.is_some_and(|r| r != index) {
                    self.terminer_renommage()?;
                }
                self.session.renommage = Some(index);
                self.session.texte_renommage = libelle;
            }

            Action::SaisirRenommage(texte) => {
                if self.session.renommage.is_some() {
                    self.session.texte_renommage = texte;
                }
            }

            Action::TerminerRenommage | Action::ClicExterieur => self.terminer_renommage()?,

            Action::AnnulerRenommage => {
                self.session.renommage = None;
                self.session.texte_renommage.clear();
            }

            Action::Vider => {
                self.sequence.vider();
                self.session.selection = None;
                self.session.renommage = None;
                self.session.texte_renommage.clear();
                self.persister();
            }
        }

        effets.extend(
            self.prendre_avertissements()
                .into_iter()
                .map(Effet::Avertissement),
        );
        Ok(effets)
    }

    fn saisir(&mut self, texte: String) {
        let t = texte.trim().to_string();
        self.session.entree = texte;

        let Some(r) = self.recherche.as_mut() else {
            return;
        };

        // pas de recherche pour un champ vide ou un opérateur seul
        let operateur_seul = {
            let mut c = t.chars();
            matches!((c.next(), c.next()), (Some(ch), None) if Operateur::depuis_char(ch).is_some())
        };
        if t.is_empty() || operateur_seul {
            r.annuler();
        } else {
            r.demander(&t);
        }
    }

    fn vider_entree(&mut self) {
        self.session.entree.clear();
        if let Some(r) = self.recherche.as_mut() {
            r.annuler();
        }
    }

    /// Entrée sur un champ non vide : première suggestion filtrée, sinon texte résolu.
    /// Champ vide : rien.
    fn valider_entree(&mut self) {
        if self.session.entree.trim().is_empty() {
            return;
        }

        let premier = self.candidats().first().map(|s| (*s).clone());
        let jeton = match premier {
            Some(s) => s.en_jeton(),
            None => self.resolve_free_text(&self.session.entree),
        };
        self.append(jeton);
        self.vider_entree();
    }

    fn choisir(&mut self, s: &Suggestion) {
        self.append(s.en_jeton());
        self.vider_entree();
    }

    /// Le type est re-déduit du texte (nombre ou variable), sans consulter les suggestions.
    /// Texte inchangé ou vide : le jeton d’origine est gardé.
    fn terminer_renommage(&mut self) -> Resultat<()> {
        let Some(index) = self.session.renommage.take() else {
            return Ok(());
        };
        let texte = std::mem::take(&mut self.session.texte_renommage);
        let t = texte.trim();

        let Some(origine) = self.sequence.get(index) else {
            return Err(self.hors_sequence(index));
        };
        if t.is_empty() || t == origine.libelle() {
            return Ok(());
        }

        let nouveau = match (lire_nombre(t), origine) {
            (Some(v), _) => Jeton::nombre(v),
            (None, Jeton::Variable { id, .. }) => Jeton::variable_avec_id(id.clone(), t, 0.0, None),
            (None, _) => Jeton::variable(t, 0.0),
        };
        self.replace_at(index, nouveau)?;
        Ok(())
    }

    fn verifier_index(&self, index: usize) -> Resultat<()> {
        if index < self.sequence.len() {
            Ok(())
        } else {
            Err(self.hors_sequence(index))
        }
    }

    fn hors_sequence(&self, index: usize) -> ErreurFormule {
        ErreurFormule::Index {
            index,
            len: self.sequence.len(),
        }
    }
}

/// Index de session après retrait de `retire` : perdu s’il désignait ce jeton,
/// décalé de un s’il était après.
fn decaler(index: Option<usize>, retire: usize) -> Option<usize> {
    match index {
        Some(i) if i == retire => None,
        Some(i) if i > retire => Some(i - 1),
        autre => autre,
    }
}
