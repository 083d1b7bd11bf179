//! src/noyau/erreurs.rs
//!
//! Taxonomie des erreurs du noyau.
//!
//! Politique de reprise :
//! - Index         : toujours remonté à l’appelant, jamais corrigé.
//! - Syntaxe       : évaluation abandonnée, aucun résultat partiel.
//! - Suggestion    : repris localement (branche “pas de correspondance”).
//! - Persistance   : repris localement (l’état mémoire fait foi), simple avertissement.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErreurFormule {
    #[error("index {index} hors séquence (longueur {len})")]
    Index { index: usize, len: usize },

    #[error(transparent)]
    Syntaxe(#[from] ErreurSyntaxe),

    #[error("suggestions indisponibles: {0}")]
    SuggestionIndisponible(String),

    #[error("persistance: {0}")]
    Persistance(String),
}

/// Erreur structurelle, toujours rattachée au jeton fautif.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{nature} (jeton {index})")]
pub struct ErreurSyntaxe {
    pub index: usize,
    pub nature: NatureSyntaxe,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NatureSyntaxe {
    #[error("parenthèse non fermée")]
    ParentheseNonFermee,

    #[error("parenthèse fermante sans ouvrante")]
    ParentheseNonOuverte,

    #[error("opérande manquant")]
    OperandeManquant,

    #[error("opérande inattendu")]
    OperandeInattendu,
}

impl ErreurSyntaxe {
    pub fn new(index: usize, nature: NatureSyntaxe) -> Self {
        Self { index, nature }
    }
}

pub type Resultat<T> = std::result::Result<T, ErreurFormule>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_syntaxe_nomme_l_index() {
        let e: ErreurFormule = ErreurSyntaxe::new(3, NatureSyntaxe::OperandeManquant).into();
        assert_eq!(e.to_string(), "opérande manquant (jeton 3)");
    }

    #[test]
    fn message_index() {
        let e = ErreurFormule::Index { index: 2, len: 0 };
        assert_eq!(e.to_string(), "index 2 hors séquence (longueur 0)");
    }
}
