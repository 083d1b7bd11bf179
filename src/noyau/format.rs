// src/noyau/format.rs

use super::jetons::Jeton;
use super::rpn::{EtapeRpn, OpRpn};

/* ------------------------ Nombres ------------------------ */

/// Au-delà (ou en deçà), on passe en notation scientifique.
const SEUIL_SCIENTIFIQUE_HAUT: f64 = 1e15;
const SEUIL_SCIENTIFIQUE_BAS: f64 = 1e-6;

/// Affichage d’un résultat, valeurs spéciales IEEE comprises :
/// NaN -> "indéfini", ±∞ -> "∞" / "-∞", -0 -> "0".
pub fn format_resultat(v: f64) -> String {
    if v.is_nan() {
        return "indéfini".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "∞" } else { "-∞" }.to_string();
    }
    if v == 0.0 {
        return "0".to_string();
    }

    let a = v.abs();
    if !(SEUIL_SCIENTIFIQUE_BAS..SEUIL_SCIENTIFIQUE_HAUT).contains(&a) {
        return format!("{v:e}");
    }
    format!("{v}")
}

/* ------------------------ Jetons / RPN ------------------------ */

/// Format utilitaire (démarche) : liste de jetons en texte.
pub fn format_sequence(jetons: &[Jeton]) -> String {
    jetons
        .iter()
        .map(Jeton::libelle)
        .collect::<Vec<_>>()
        .join(" ")
}

/// RPN en texte ; l’opposé unaire est noté "neg", le plus unaire "pos".
pub fn format_rpn(rpn: &[EtapeRpn]) -> String {
    let mut out = Vec::with_capacity(rpn.len());
    for e in rpn {
        let s = match e.op {
            OpRpn::Valeur(v) => format!("{v}"),

            OpRpn::Plus => "+".to_string(),
            OpRpn::Moins => "-".to_string(),
            OpRpn::Fois => "*".to_string(),
            OpRpn::Divise => "/".to_string(),
            OpRpn::Puissance => "^".to_string(),

            OpRpn::Oppose => "neg".to_string(),
            OpRpn::Identite => "pos".to_string(),
        };
        out.push(s);
    }
    out.join(" ")
}
