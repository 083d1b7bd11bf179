//! Noyau — évaluation (pipeline réel)
//!
//! jetons -> lexèmes -> RPN (validation structurelle) -> pile f64 -> résultat
//!
//! Remarques :
//! - Séquence vide => 0 (cas explicite, pas une erreur).
//! - Arithmétique IEEE 754 : x/0 donne ±∞ ou NaN, jamais une erreur.
//! - Aucun texte n’est exécuté : seuls des jetons typés entrent dans le pipeline.

use super::erreurs::{ErreurSyntaxe, NatureSyntaxe};
use super::format::{format_rpn, format_sequence};
use super::jetons::Jeton;
use super::rpn::{lexemes, to_rpn, EtapeRpn, OpRpn};

#[derive(Default, Clone, Debug, PartialEq)]
pub struct Demarche {
    pub jetons: String,
    pub rpn: String,
}

/// API publique : évalue une séquence de jetons.
pub fn eval_sequence(jetons: &[Jeton]) -> Result<f64, ErreurSyntaxe> {
    eval_avec_demarche(jetons).map(|(v, _)| v)
}

/// Comme `eval_sequence`, avec la démarche (jetons + RPN en texte) pour l’affichage.
pub fn eval_avec_demarche(jetons: &[Jeton]) -> Result<(f64, Demarche), ErreurSyntaxe> {
    let jetons_txt = format_sequence(jetons);

    if jetons.is_empty() {
        let d = Demarche {
            jetons: jetons_txt,
            rpn: String::new(),
        };
        return Ok((0.0, d));
    }

    // 1) Lexèmes
    let items = lexemes(jetons);

    // 2) RPN (+ validation)
    let rpn = to_rpn(&items)?;
    let rpn_txt = format_rpn(&rpn);

    // 3) Pile
    let v = eval_rpn(&rpn)?;

    tracing::debug!(jetons = %jetons_txt, rpn = %rpn_txt, resultat = v, "évaluation");

    Ok((
        v,
        Demarche {
            jetons: jetons_txt,
            rpn: rpn_txt,
        },
    ))
}

/// Évalue une RPN sur une pile de f64.
/// Une RPN issue de `to_rpn` est toujours bien formée ; les contrôles restent
/// pour une RPN construite à la main.
pub fn eval_rpn(rpn: &[EtapeRpn]) -> Result<f64, ErreurSyntaxe> {
    let mut st: Vec<f64> = Vec::with_capacity(rpn.len());

    for etape in rpn {
        let manque = || ErreurSyntaxe::new(etape.index, NatureSyntaxe::OperandeManquant);

        match etape.op {
            OpRpn::Valeur(v) => st.push(v),

            OpRpn::Oppose => {
                let a = st.pop().ok_or_else(manque)?;
                st.push(-a);
            }
            OpRpn::Identite => {
                if st.is_empty() {
                    return Err(manque());
                }
            }

            OpRpn::Plus | OpRpn::Moins | OpRpn::Fois | OpRpn::Divise | OpRpn::Puissance => {
                let b = st.pop().ok_or_else(manque)?;
                let a = st.pop().ok_or_else(manque)?;

                let r = match etape.op {
                    OpRpn::Plus => a + b,
                    OpRpn::Moins => a - b,
                    OpRpn::Fois => a * b,
                    OpRpn::Divise => a / b,
                    _ => a.powf(b),
                };
                st.push(r);
            }
        }
    }

    match (st.pop(), st.is_empty()) {
        (Some(v), true) => Ok(v),
        (None, _) => Ok(0.0),
        (Some(_), false) => {
            let index = rpn.last().map(|e| e.index).unwrap_or(0);
            Err(ErreurSyntaxe::new(index, NatureSyntaxe::OperandeInattendu))
        }
    }
}
