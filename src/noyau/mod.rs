//! Noyau formule à étiquettes
//!
//! Organisation interne :
//! - erreurs.rs      : taxonomie (index, syntaxe, suggestions, persistance)
//! - jetons.rs       : jetons + séquence + littéral décimal + ids
//! - rpn.rs          : lexèmes + shunting-yard (validation structurelle)
//! - eval.rs         : pipeline complet (RPN -> f64)
//! - format.rs       : affichage (jetons, RPN, résultats IEEE)
//! - suggestions.rs  : source de suggestions + recherche asynchrone
//! - persistance.rs  : format JSON + stockages
//! - editeur.rs      : API de mutation + politique clavier

pub mod editeur;
pub mod erreurs;
pub mod eval;
pub mod format;
pub mod jetons;
pub mod persistance;
pub mod rpn;
pub mod suggestions;

#[cfg(test)]
mod tests_proprietes;

#[cfg(test)]
mod tests_fuzz_safe;

// API publique minimale
pub use editeur::{Action, Editeur, Effet};
pub use erreurs::ErreurFormule;
