// src/noyau/jetons.rs
//
// Modèle de jetons : Nombre / Variable / Opérateur + séquence ordonnée.
//
// Règles:
// - Un opérateur est forcément un des 7 symboles + - * / ^ ( )
// - Les valeurs sont finies ; sinon elles retombent à 0 (politique “défaut à zéro”)
// - L’égalité est structurelle ; l’id d’une Variable n’est jamais comparé
// - Les index ne sont PAS des identifiants stables (décalage après retrait)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};

use super::erreurs::{ErreurFormule, Resultat};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operateur {
    Plus,
    Moins,
    Fois,
    Divise,
    Puissance, // ^

    ParOuvrante,
    ParFermante,
}

impl Operateur {
    pub const TOUS: [Operateur; 7] = [
        Operateur::Plus,
        Operateur::Moins,
        Operateur::Fois,
        Operateur::Divise,
        Operateur::Puissance,
        Operateur::ParOuvrante,
        Operateur::ParFermante,
    ];

    /// Seule porte d’entrée depuis du texte : tout autre caractère est refusé.
    pub fn depuis_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Plus),
            '-' => Some(Self::Moins),
            '*' => Some(Self::Fois),
            '/' => Some(Self::Divise),
            '^' => Some(Self::Puissance),
            '(' => Some(Self::ParOuvrante),
            ')' => Some(Self::ParFermante),
            _ => None,
        }
    }

    pub fn symbole(self) -> char {
        match self {
            Self::Plus => '+',
            Self::Moins => '-',
            Self::Fois => '*',
            Self::Divise => '/',
            Self::Puissance => '^',
            Self::ParOuvrante => '(',
            Self::ParFermante => ')',
        }
    }
}

#[derive(Clone, Debug)]
pub enum Jeton {
    Nombre {
        valeur: f64,
    },

    // `categorie` : info d’affichage (catalogue de suggestions), hors égalité/évaluation.
    Variable {
        id: String,
        nom: String,
        valeur: f64,
        categorie: Option<String>,
    },

    Operateur(Operateur),
}

impl Jeton {
    pub fn nombre(valeur: f64) -> Self {
        Self::Nombre {
            valeur: valeur_finie(valeur),
        }
    }

    /// Nouvelle variable : reçoit un id neuf.
    pub fn variable(nom: impl Into<String>, valeur: f64) -> Self {
        Self::Variable {
            id: nouvel_id(),
            nom: nom.into(),
            valeur: valeur_finie(valeur),
            categorie: None,
        }
    }

    /// Variable dont l’id est déjà connu (rechargement, renommage en place).
    pub fn variable_avec_id(
        id: impl Into<String>,
        nom: impl Into<String>,
        valeur: f64,
        categorie: Option<String>,
    ) -> Self {
        Self::Variable {
            id: id.into(),
            nom: nom.into(),
            valeur: valeur_finie(valeur),
            categorie,
        }
    }

    pub fn operateur(c: char) -> Option<Self> {
        Operateur::depuis_char(c).map(Self::Operateur)
    }

    pub fn est_operateur(&self) -> bool {
        matches!(self, Self::Operateur(_))
    }

    /// Contribution numérique (None pour un opérateur).
    pub fn valeur(&self) -> Option<f64> {
        match self {
            Self::Nombre { valeur } | Self::Variable { valeur, .. } => Some(*valeur),
            Self::Operateur(_) => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Variable { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Texte affiché sur l’étiquette (et point de départ d’un renommage).
    pub fn libelle(&self) -> String {
        match self {
            Self::Nombre { valeur } => format!("{valeur}"),
            Self::Variable { nom, .. } => nom.clone(),
            Self::Operateur(op) => op.symbole().to_string(),
        }
    }
}

impl PartialEq for Jeton {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nombre { valeur: a }, Self::Nombre { valeur: b }) => a == b,
            (
                Self::Variable {
                    nom: na, valeur: va, ..
                },
                Self::Variable {
                    nom: nb, valeur: vb, ..
                },
            ) => na == nb && va == vb,
            (Self::Operateur(a), Self::Operateur(b)) => a == b,
            _ => false,
        }
    }
}

fn valeur_finie(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/* ------------------------ Ids de variables ------------------------ */

static COMPTEUR_ID: AtomicU64 = AtomicU64::new(0);
static NONCE_SESSION: OnceLock<u64> = OnceLock::new();

/// Id neuf, jamais réutilisé : nonce de session (horloge au démarrage) + compteur.
/// Le nonce évite les collisions avec des ids rechargés d’une session précédente.
pub fn nouvel_id() -> String {
    let nonce = NONCE_SESSION.get_or_init(nonce_session);
    let n = COMPTEUR_ID.fetch_add(1, Ordering::Relaxed);
    format!("{nonce:x}-{n}")
}

#[cfg(not(target_arch = "wasm32"))]
fn nonce_session() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

// Pas d’horloge système en wasm32 ; le stockage web ne survit pas au rechargement.
#[cfg(target_arch = "wasm32")]
fn nonce_session() -> u64 {
    0
}

/* ------------------------ Littéral décimal ------------------------ */

/// Texte -> nombre, seulement si TOUT le texte (espaces de bord exclus) est un
/// littéral décimal fini : [+-]? chiffres [. chiffres]? ([eE] [+-]? chiffres)?
/// (".5" et "5." acceptés). "inf", "NaN", "0x10", "5abc" sont refusés.
pub fn lire_nombre(texte: &str) -> Option<f64> {
    let s = texte.trim();
    let b = s.as_bytes();
    let mut i = 0;

    if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
        i += 1;
    }

    let debut_entier = i;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
    }
    let mut chiffres = i - debut_entier;

    if i < b.len() && b[i] == b'.' {
        i += 1;
        let debut_frac = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        chiffres += i - debut_frac;
    }

    if chiffres == 0 {
        return None;
    }

    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        i += 1;
        if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
            i += 1;
        }
        let debut_exp = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        if i == debut_exp {
            return None;
        }
    }

    if i != b.len() {
        return None;
    }

    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/* ------------------------ Séquence ------------------------ */

/// Suite ordonnée de jetons, sans trous. Ordre d’insertion = ordre d’affichage
/// et d’évaluation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sequence {
    jetons: Vec<Jeton>,
}

impl Sequence {
    pub fn len(&self) -> usize {
        self.jetons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jetons.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Jeton> {
        self.jetons.get(index)
    }

    pub fn jetons(&self) -> &[Jeton] {
        &self.jetons
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Jeton> {
        self.jetons.iter()
    }

    pub fn append(&mut self, jeton: Jeton) {
        self.jetons.push(jeton);
    }

    /// Retire et renvoie le jeton ; les suivants se décalent de un.
    pub fn remove_at(&mut self, index: usize) -> Resultat<Jeton> {
        self.verifier_index(index)?;
        Ok(self.jetons.remove(index))
    }

    /// Remplace en une seule écriture et renvoie l’ancien jeton.
    pub fn replace_at(&mut self, index: usize, jeton: Jeton) -> Resultat<Jeton> {
        self.verifier_index(index)?;
        Ok(std::mem::replace(&mut self.jetons[index], jeton))
    }

    pub fn vider(&mut self) {
        self.jetons.clear();
    }

    fn verifier_index(&self, index: usize) -> Resultat<()> {
        if index < self.jetons.len() {
            Ok(())
        } else {
            Err(ErreurFormule::Index {
                index,
                len: self.jetons.len(),
            })
        }
    }
}

impl From<Vec<Jeton>> for Sequence {
    fn from(jetons: Vec<Jeton>) -> Self {
        Self { jetons }
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Jeton;
    type IntoIter = std::slice::Iter<'a, Jeton>;

    fn into_iter(self) -> Self::IntoIter {
        self.jetons.iter()
    }
}
