//! src/noyau/suggestions.rs
//!
//! Source de suggestions (collaborateur externe) + recherche asynchrone.
//!
//! Contrats :
//! - `SourceSuggestions::lookup` peut bloquer (réseau, disque) : on l’appelle hors du fil UI.
//! - Chaque demande reçoit une génération ; une demande plus récente rend les
//!   précédentes périmées, et leurs réponses sont ignorées.
//! - Une demande sans réponse à l’échéance est traitée comme “indisponible”.
//! - Un seul fil de recherche par `RechercheSuggestions` ; les demandes dépassées
//!   qui attendent encore dans la file ne sont jamais envoyées à la source.
//! - Le premier candidat est le choix par défaut ; aucun autre ordre n’est supposé.

#[cfg(test)]
use std::sync::mpsc::RecvTimeoutError;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::erreurs::{ErreurFormule, Resultat};
use super::jetons::{nouvel_id, Jeton, Operateur};

/// Catégorie réservée aux opérateurs renvoyés par une source.
pub const CATEGORIE_OPERATEUR: &str = "operator";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    #[serde(rename = "name")]
    pub nom: String,
    #[serde(rename = "category", default)]
    pub categorie: String,
    #[serde(rename = "value", default)]
    pub valeur: f64,
}

impl Suggestion {
    pub fn new(
        id: impl Into<String>,
        nom: impl Into<String>,
        categorie: impl Into<String>,
        valeur: f64,
    ) -> Self {
        Self {
            id: id.into(),
            nom: nom.into(),
            categorie: categorie.into(),
            valeur,
        }
    }

    /// Jeton inséré quand on choisit cette suggestion.
    /// Chaque insertion est une nouvelle instance : l’id du jeton est neuf.
    pub fn en_jeton(&self) -> Jeton {
        if self.categorie == CATEGORIE_OPERATEUR {
            let mut c = self.nom.chars();
            if let (Some(ch), None) = (c.next(), c.next()) {
                if let Some(op) = Operateur::depuis_char(ch) {
                    return Jeton::Operateur(op);
                }
            }
        }

        Jeton::variable_avec_id(
            nouvel_id(),
            self.nom.clone(),
            self.valeur,
            Some(self.categorie.clone()),
        )
    }

    fn contient(&self, texte_min: &str) -> bool {
        self.nom.to_lowercase().contains(texte_min)
    }
}

/// Service de suggestions : texte -> candidats (éventuellement vide).
pub trait SourceSuggestions: Send + Sync {
    fn lookup(&self, prefixe: &str) -> Resultat<Vec<Suggestion>>;
}

/* ------------------------ Catalogue en mémoire ------------------------ */

/// Source locale : liste fixe (typiquement chargée depuis la configuration).
#[derive(Clone, Debug, Default)]
pub struct Catalogue {
    entrees: Vec<Suggestion>,
}

impl Catalogue {
    pub fn new(entrees: Vec<Suggestion>) -> Self {
        Self { entrees }
    }
}

impl SourceSuggestions for Catalogue {
    fn lookup(&self, prefixe: &str) -> Resultat<Vec<Suggestion>> {
        Ok(filtrer(&self.entrees, prefixe).into_iter().cloned().collect())
    }
}

/* ------------------------ Filtrage ------------------------ */

/// Candidats dont le nom contient `texte` (insensible à la casse), ordre conservé.
pub fn filtrer<'a>(candidats: &'a [Suggestion], texte: &str) -> Vec<&'a Suggestion> {
    let t = texte.to_lowercase();
    candidats.iter().filter(|s| s.contient(&t)).collect()
}

/// Nom identique (casse ignorée) d’abord, sinon premier candidat qui contient le texte.
pub fn meilleure_correspondance<'a>(
    candidats: &'a [Suggestion],
    texte: &str,
) -> Option<&'a Suggestion> {
    let t = texte.to_lowercase();
    candidats
        .iter()
        .find(|s| s.nom.to_lowercase() == t)
        .or_else(|| candidats.iter().find(|s| s.contient(&t)))
}

/* ------------------------ Recherche asynchrone ------------------------ */

struct Reponse {
    generation: u64,
    texte: String,
    resultat: Resultat<Vec<Suggestion>>,
}

struct EnCours {
    generation: u64,
    texte: String,
    echeance: Echeance,
}

/// Ce qu’a produit une récolte.
#[derive(Clone, Debug, PartialEq)]
pub enum Recolte {
    /// Rien de nouveau (pas de demande, ou réponse pas encore arrivée).
    Rien,
    /// Candidats à jour pour le texte courant.
    Candidats,
    /// La source a échoué ou n’a pas répondu à temps.
    Indisponible(ErreurFormule),
}

/// Lance les recherches hors du fil appelant et ne garde que la plus récente.
pub struct RechercheSuggestions {
    ouvrier: Ouvrier,
    delai: Duration,

    generation: u64,
    en_cours: Option<EnCours>,
    tx: Sender<Reponse>,
    rx: Receiver<Reponse>,

    candidats: Vec<Suggestion>,
    texte_candidats: String,
}

impl RechercheSuggestions {
    pub fn new(source: Arc<dyn SourceSuggestions>, delai: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            ouvrier: Ouvrier::demarrer(source),
            delai,
            generation: 0,
            en_cours: None,
            tx,
            rx,
            candidats: Vec::new(),
            texte_candidats: String::new(),
        }
    }

    /// Derniers candidats reçus (pour `texte_candidats()`).
    pub fn candidats(&self) -> &[Suggestion] {
        &self.candidats
    }

    pub fn texte_candidats(&self) -> &str {
        &self.texte_candidats
    }

    pub fn en_attente(&self) -> bool {
        self.en_cours.is_some()
    }

    /// Nouvelle demande : toute demande précédente devient périmée.
    pub fn demander(&mut self, texte: &str) {
        self.generation += 1;
        let generation = self.generation;

        self.en_cours = Some(EnCours {
            generation,
            texte: texte.to_string(),
            echeance: Echeance::dans(self.delai),
        });

        tracing::trace!(generation, texte, "recherche de suggestions");
        self.ouvrier.confier(Demande {
            generation,
            texte: texte.to_string(),
            perimable: true,
            tx: self.tx.clone(),
        });
    }

    /// Abandonne la demande en cours et vide les candidats.
    pub fn annuler(&mut self) {
        self.generation += 1;
        self.en_cours = None;
        self.candidats.clear();
        self.texte_candidats.clear();
    }

    /// Non bloquant : à appeler régulièrement (ex: à chaque frame).
    pub fn recolter(&mut self) -> Recolte {
        let mut recolte = Recolte::Rien;
        while let Ok(rep) = self.rx.try_recv() {
            if let Some(r) = self.accepter(rep) {
                recolte = r;
            }
        }

        if recolte == Recolte::Rien {
            if let Some(r) = self.verifier_echeance() {
                recolte = r;
            }
        }
        recolte
    }

    /// Bloquant, borné par l’échéance de la demande en cours.
    #[cfg(test)]
    pub fn attendre(&mut self) -> Recolte {
        loop {
            let Some(reste) = self.en_cours.as_ref().map(|e| e.echeance.reste()) else {
                return Recolte::Rien;
            };

            match self.rx.recv_timeout(reste) {
                Ok(rep) => {
                    if let Some(r) = self.accepter(rep) {
                        return r;
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return self.verifier_echeance().unwrap_or(Recolte::Rien);
                }
            }
        }
    }

    /// Recherche synchrone bornée par le délai (utilisée pour résoudre un texte libre).
    pub fn rechercher_maintenant(&self, texte: &str) -> Resultat<Vec<Suggestion>> {
        self.ouvrier.rechercher(texte, self.delai)
    }

    fn accepter(&mut self, rep: Reponse) -> Option<Recolte> {
        let courante = self
            .en_cours
            .as_ref()
            .is_some_and(|e| e.generation == rep.generation);

        if !courante {
            tracing::debug!(
                generation = rep.generation,
                texte = %rep.texte,
                "réponse de suggestions périmée ignorée"
            );
            return None;
        }

        self.en_cours = None;
        match rep.resultat {
            Ok(candidats) => {
                tracing::trace!(texte = %rep.texte, n = candidats.len(), "suggestions reçues");
                self.candidats = candidats;
                self.texte_candidats = rep.texte;
                Some(Recolte::Candidats)
            }
            Err(e) => {
                tracing::warn!(texte = %rep.texte, erreur = %e, "suggestions indisponibles");
                self.candidats.clear();
                self.texte_candidats.clear();
                Some(Recolte::Indisponible(indisponible(e)))
            }
        }
    }

    fn verifier_echeance(&mut self) -> Option<Recolte> {
        let echue = self
            .en_cours
            .as_ref()
            .is_some_and(|e| e.echeance.depassee());
        if !echue {
            return None;
        }

        let texte = self.en_cours.take().map(|e| e.texte).unwrap_or_default();
        tracing::warn!(texte = %texte, "suggestions: délai dépassé");
        self.candidats.clear();
        self.texte_candidats.clear();
        Some(Recolte::Indisponible(hors_delai(self.delai)))
    }
}

fn indisponible(e: ErreurFormule) -> ErreurFormule {
    match e {
        ErreurFormule::SuggestionIndisponible(_) => e,
        autre => ErreurFormule::SuggestionIndisponible(autre.to_string()),
    }
}

fn hors_delai(delai: Duration) -> ErreurFormule {
    ErreurFormule::SuggestionIndisponible(format!(
        "pas de réponse après {} ms",
        delai.as_millis()
    ))
}

/* ------------------------ Ouvrier ------------------------ */

struct Demande {
    generation: u64,
    texte: String,
    /// Une demande périmable peut être sautée si une plus récente attend déjà.
    perimable: bool,
    tx: Sender<Reponse>,
}

fn traiter(source: &dyn SourceSuggestions, d: Demande) {
    let resultat = source.lookup(&d.texte);
    // Récepteur disparu = plus personne n’attend : rien à faire.
    let _ = d.tx.send(Reponse {
        generation: d.generation,
        texte: d.texte,
        resultat,
    });
}

/// Un seul fil pour toutes les recherches : une source lente ne fait jamais
/// grossir le nombre de fils, seulement la file.
#[cfg(not(target_arch = "wasm32"))]
struct Ouvrier {
    tx: Sender<Demande>,
}

#[cfg(not(target_arch = "wasm32"))]
impl Ouvrier {
    fn demarrer(source: Arc<dyn SourceSuggestions>) -> Self {
        let (tx, rx) = mpsc::channel();
        let lance = std::thread::Builder::new()
            .name("suggestions".into())
            .spawn(move || boucle(source.as_ref(), rx));
        if let Err(e) = lance {
            // les demandes resteront sans réponse : chacune finira “indisponible”
            tracing::error!(erreur = %e, "fil de suggestions non démarré");
        }
        Self { tx }
    }

    fn confier(&self, d: Demande) {
        if self.tx.send(d).is_err() {
            tracing::warn!("fil de suggestions arrêté, demande perdue");
        }
    }

    fn rechercher(&self, texte: &str, delai: Duration) -> Resultat<Vec<Suggestion>> {
        let (tx, rx) = mpsc::channel();
        self.confier(Demande {
            generation: 0,
            texte: texte.to_string(),
            perimable: false,
            tx,
        });

        match rx.recv_timeout(delai) {
            Ok(rep) => rep.resultat,
            Err(_) => Err(hors_delai(delai)),
        }
    }
}

/// Vide la file par lots : parmi les demandes périmables d’un lot, seule la
/// dernière est traitée ; les demandes synchrones le sont toutes, dans l’ordre.
#[cfg(not(target_arch = "wasm32"))]
fn boucle(source: &dyn SourceSuggestions, rx: Receiver<Demande>) {
    while let Ok(premiere) = rx.recv() {
        let mut lot = vec![premiere];
        lot.extend(rx.try_iter());

        let derniere = lot.iter().rposition(|d| d.perimable);
        for (i, d) in lot.into_iter().enumerate() {
            if d.perimable && Some(i) != derniere {
                tracing::trace!(generation = d.generation, "demande dépassée, sautée");
                continue;
            }
            traiter(source, d);
        }
    }
    tracing::debug!("fil de suggestions terminé");
}

// Pas de fils en wasm32 : la source est appelée sur place.
#[cfg(target_arch = "wasm32")]
struct Ouvrier {
    source: Arc<dyn SourceSuggestions>,
}

#[cfg(target_arch = "wasm32")]
impl Ouvrier {
    fn demarrer(source: Arc<dyn SourceSuggestions>) -> Self {
        Self { source }
    }

    fn confier(&self, d: Demande) {
        traiter(self.source.as_ref(), d);
    }

    fn rechercher(&self, texte: &str, _delai: Duration) -> Resultat<Vec<Suggestion>> {
        self.source.lookup(texte)
    }
}

/* ------------------------ Échéances ------------------------ */

#[cfg(not(target_arch = "wasm32"))]
#[derive(Clone, Copy, Debug)]
struct Echeance(Instant);

#[cfg(not(target_arch = "wasm32"))]
impl Echeance {
    fn dans(delai: Duration) -> Self {
        Self(Instant::now() + delai)
    }

    fn depassee(&self) -> bool {
        Instant::now() >= self.0
    }

    #[cfg(test)]
    fn reste(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }
}

// Pas d’horloge en wasm32 : la réponse y arrive pendant `demander`, avant toute échéance.
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Copy, Debug)]
struct Echeance;

#[cfg(target_arch = "wasm32")]
impl Echeance {
    fn dans(_delai: Duration) -> Self {
        Self
    }

    fn depassee(&self) -> bool {
        false
    }
}
