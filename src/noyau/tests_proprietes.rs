//! Tests de propriétés (campagne) : scénarios bout en bout éditeur + évaluation + stockage.
//!
//! Chaque test part de l’API publique du noyau (`Editeur`, `Action`, `Effet`),
//! comme le ferait l’UI.

use std::sync::Arc;
use std::time::Duration;

use super::erreurs::{ErreurSyntaxe, NatureSyntaxe};
use super::eval::eval_sequence;
use super::jetons::Jeton;
use super::persistance::{deserialiser, serialiser, Stockage, StockageFichier};
use super::suggestions::{Catalogue, RechercheSuggestions, Suggestion};
use super::{Action, Editeur, Effet, ErreurFormule};

fn op(c: char) -> Jeton {
    Jeton::operateur(c).unwrap()
}

fn n(v: f64) -> Jeton {
    Jeton::nombre(v)
}

fn valeur(effets: &[Effet]) -> Option<f64> {
    effets.iter().find_map(|e| match e {
        Effet::Resultat { valeur, .. } => Some(*valeur),
        _ => None,
    })
}

/// Tape une formule comme au clavier : chaque mot est saisi puis suivi de son opérateur.
fn taper_formule(ed: &mut Editeur, morceaux: &[&str]) {
    for m in morceaux {
        let mut c = m.chars();
        match (c.next(), c.next()) {
            (Some(ch), None) if Jeton::operateur(ch).is_some() => {
                ed.appliquer(Action::Operateur(ch)).unwrap();
            }
            _ => {
                ed.appliquer(Action::Saisir(m.to_string())).unwrap();
            }
        }
    }
}

#[test]
fn prop_echec_d_index_laisse_la_sequence_intacte() {
    let mut ed = Editeur::new();
    assert!(matches!(ed.remove_at(0), Err(ErreurFormule::Index { .. })));
    assert!(matches!(
        ed.replace_at(0, n(1.0)),
        Err(ErreurFormule::Index { .. })
    ));
    assert!(ed.sequence().is_empty());

    ed.append(n(1.0));
    let avant = ed.sequence().clone();
    assert!(ed.replace_at(1, n(2.0)).is_err());
    assert!(ed.appliquer(Action::CommencerRenommage(3)).is_err());
    assert_eq!(ed.sequence(), &avant);
}

#[test]
fn prop_aller_retour_stockage() {
    let s = vec![
        op('('),
        Jeton::variable("revenue", 1200.0),
        op('-'),
        Jeton::variable("cost", 0.0),
        op(')'),
        op('/'),
        n(4.0),
    ];
    let relu = deserialiser(&serialiser(&s).unwrap()).unwrap();
    assert_eq!(relu, s);
    for (a, b) in relu.iter().zip(&s) {
        assert_eq!(a.id(), b.id());
    }

    let dir = tempfile::tempdir().unwrap();
    let mut st = StockageFichier::new(dir.path().join("formule.json"));
    st.save(&s).unwrap();
    assert_eq!(st.load().unwrap(), Some(s));
}

#[test]
fn prop_evaluation_idempotente() {
    let mut ed = Editeur::new();
    taper_formule(&mut ed, &["7", "/", "3", "^", "0.5"]);
    let a = valeur(&ed.appliquer(Action::Evaluer).unwrap()).unwrap();
    let b = valeur(&ed.appliquer(Action::Evaluer).unwrap()).unwrap();
    assert_eq!(a.to_bits(), b.to_bits());
}

#[test]
fn scenario_precedence() {
    let s = [n(3.0), op('+'), n(4.0), op('*'), n(2.0)];
    assert_eq!(eval_sequence(&s), Ok(11.0));
}

#[test]
fn scenario_parentheses_puissance() {
    let s = [op('('), n(1.0), op('+'), n(2.0), op(')'), op('^'), n(2.0)];
    assert_eq!(eval_sequence(&s), Ok(9.0));
}

#[test]
fn scenario_vide_et_operateur_seul() {
    assert_eq!(eval_sequence(&[]), Ok(0.0));
    assert_eq!(
        eval_sequence(&[op('+')]),
        Err(ErreurSyntaxe::new(0, NatureSyntaxe::OperandeManquant))
    );
}

#[test]
fn scenario_texte_libre() {
    let ed = Editeur::new();
    assert_eq!(ed.resolve_free_text("42"), n(42.0));
    match ed.resolve_free_text("revenue") {
        Jeton::Variable { nom, valeur, .. } => {
            assert_eq!(nom, "revenue");
            assert_eq!(valeur, 0.0);
        }
        autre => panic!("attendu une variable: {autre:?}"),
    }
}

#[test]
fn scenario_operateur_apres_tampon() {
    let mut ed = Editeur::new();
    ed.append(n(1.0));
    ed.append(op('*'));
    let avant = ed.sequence().len();

    ed.appliquer(Action::Saisir("5".into())).unwrap();
    ed.appliquer(Action::Operateur('+')).unwrap();

    let jetons = ed.sequence().jetons();
    assert_eq!(jetons.len(), avant + 2);
    assert_eq!(&jetons[avant..], &[n(5.0), op('+')]);
    assert!(ed.session().entree.is_empty());
}

#[test]
fn scenario_session_complete() {
    let catalogue = Catalogue::new(vec![
        Suggestion::new("1", "Revenue", "finance", 1000.0),
        Suggestion::new("2", "Cost", "finance", 250.0),
        Suggestion::new("3", "Margin", "finance", 0.5),
    ]);
    let recherche = RechercheSuggestions::new(Arc::new(catalogue), Duration::from_secs(2));
    let dir = tempfile::tempdir().unwrap();
    let chemin = dir.path().join("formule.json");

    let mut ed = Editeur::new()
        .avec_suggestions(recherche)
        .avec_stockage(Box::new(StockageFichier::new(&chemin)));

    // ( Revenue - Cost ) * marg⏎
    ed.appliquer(Action::Operateur('(')).unwrap();
    ed.appliquer(Action::Saisir("rev".into())).unwrap();
    ed.attendre_suggestions();
    ed.appliquer(Action::AccepterSuggestion).unwrap();
    ed.appliquer(Action::Operateur('-')).unwrap();
    ed.appliquer(Action::Saisir("cost".into())).unwrap();
    ed.appliquer(Action::Operateur(')')).unwrap();
    ed.appliquer(Action::Operateur('*')).unwrap();
    ed.appliquer(Action::Saisir("marg".into())).unwrap();
    ed.attendre_suggestions();
    let effets = ed.appliquer(Action::Evaluer).unwrap();
    assert_eq!(valeur(&effets), Some(375.0));

    // retour arrière sur champ vide : retire "Margin", puis "*"
    ed.appliquer(Action::Effacer).unwrap();
    ed.appliquer(Action::Effacer).unwrap();
    assert_eq!(valeur(&ed.appliquer(Action::Evaluer).unwrap()), Some(750.0));

    // une nouvelle session retrouve la même formule
    let mut relu = Editeur::new().avec_stockage(Box::new(StockageFichier::new(&chemin)));
    assert_eq!(relu.charger(), None);
    assert_eq!(relu.sequence(), ed.sequence());
    assert_eq!(relu.evaluer(), Ok(750.0));
}
