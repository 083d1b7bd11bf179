// src/noyau/rpn.rs
//
// Shunting-yard -> RPN
// Objectif:
// - Associer chaque jeton à un lexème (opérande / opérateur), en gardant son index
// - Valider la structure au passage (erreur = index du jeton fautif)
// - Sortir une RPN (postfix) prête à être évaluée en f64
//
// Règles:
// - Précédences : ^ (4, droite) > unaire +/- (3) > * / (2, gauche) > binaire + - (1, gauche)
// - + et - sont unaires quand on attend une valeur (début, après '(' ou un opérateur)
// - * / ^ quand on attend une valeur : opérande manquant
// - Deux valeurs collées (ex: "2 3", "2 (") : opérande inattendu
//
// NOTE:
// - Les unaires sont préfixes : on les empile sans rien dépiler.
// - Aucun texte n’est interprété ici : seuls des jetons déjà typés entrent.

use super::erreurs::{ErreurSyntaxe, NatureSyntaxe};
use super::jetons::{Jeton, Operateur};

/// Lexème : jeton réduit à ce dont l’évaluation a besoin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Lexeme {
    Operande(f64),
    Operateur(Operateur),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Item {
    pub index: usize,
    pub lexeme: Lexeme,
}

/// Étape 1 : Nombre/Variable -> opérande (valeur), Opérateur -> opérateur.
pub fn lexemes(jetons: &[Jeton]) -> Vec<Item> {
    jetons
        .iter()
        .enumerate()
        .map(|(index, j)| {
            let lexeme = match j {
                Jeton::Nombre { valeur } | Jeton::Variable { valeur, .. } => {
                    Lexeme::Operande(*valeur)
                }
                Jeton::Operateur(op) => Lexeme::Operateur(*op),
            };
            Item { index, lexeme }
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OpRpn {
    Valeur(f64),

    Plus,
    Moins,
    Fois,
    Divise,
    Puissance,

    // unaires
    Oppose,
    Identite,
}

/// Une étape RPN garde l’index du jeton d’origine (trace + erreurs).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EtapeRpn {
    pub index: usize,
    pub op: OpRpn,
}

/// Élément de la pile d’opérateurs.
#[derive(Clone, Copy, Debug)]
enum SurPile {
    ParOuvrante(usize),
    Op(usize, OpRpn),
}

fn precedence(op: OpRpn) -> u8 {
    match op {
        OpRpn::Plus | OpRpn::Moins => 1,
        OpRpn::Fois | OpRpn::Divise => 2,
        OpRpn::Oppose | OpRpn::Identite => 3,
        OpRpn::Puissance => 4,
        OpRpn::Valeur(_) => 0,
    }
}

fn is_right_associative(op: OpRpn) -> bool {
    matches!(op, OpRpn::Puissance)
}

fn binaire(op: Operateur) -> Option<OpRpn> {
    match op {
        Operateur::Plus => Some(OpRpn::Plus),
        Operateur::Moins => Some(OpRpn::Moins),
        Operateur::Fois => Some(OpRpn::Fois),
        Operateur::Divise => Some(OpRpn::Divise),
        Operateur::Puissance => Some(OpRpn::Puissance),
        Operateur::ParOuvrante | Operateur::ParFermante => None,
    }
}

/// Convertit les lexèmes en RPN (notation polonaise inversée), en validant la structure.
///
/// Exemple:
///   jetons: [3, +, 4, *, 2]
///   rpn:    [3, 4, 2, *, +]
///
/// Une séquence vide donne une RPN vide (l’évaluation la traite à part).
pub fn to_rpn(items: &[Item]) -> Result<Vec<EtapeRpn>, ErreurSyntaxe> {
    let mut out: Vec<EtapeRpn> = Vec::with_capacity(items.len());
    let mut ops: Vec<SurPile> = Vec::new();

    // Vrai au début, après '(' et après tout opérateur.
    let mut attend_valeur = true;

    for item in items {
        let index = item.index;

        match item.lexeme {
            Lexeme::Operande(v) => {
                if !attend_valeur {
                    return Err(ErreurSyntaxe::new(index, NatureSyntaxe::OperandeInattendu));
                }
                out.push(EtapeRpn {
                    index,
                    op: OpRpn::Valeur(v),
                });
                attend_valeur = false;
            }

            Lexeme::Operateur(Operateur::ParOuvrante) => {
                // "2 (" : une nouvelle valeur commence là où on n’en attend pas
                if !attend_valeur {
                    return Err(ErreurSyntaxe::new(index, NatureSyntaxe::OperandeInattendu));
                }
                ops.push(SurPile::ParOuvrante(index));
            }

            Lexeme::Operateur(Operateur::ParFermante) => {
                if attend_valeur {
                    return Err(ErreurSyntaxe::new(index, NatureSyntaxe::OperandeManquant));
                }

                // dépile jusqu’à '('
                loop {
                    match ops.pop() {
                        Some(SurPile::ParOuvrante(_)) => break,
                        Some(SurPile::Op(i, op)) => out.push(EtapeRpn { index: i, op }),
                        None => {
                            return Err(ErreurSyntaxe::new(
                                index,
                                NatureSyntaxe::ParentheseNonOuverte,
                            ))
                        }
                    }
                }

                attend_valeur = false;
            }

            Lexeme::Operateur(op) if attend_valeur => {
                // signe préfixe
                let unaire = match op {
                    Operateur::Moins => OpRpn::Oppose,
                    Operateur::Plus => OpRpn::Identite,
                    _ => return Err(ErreurSyntaxe::new(index, NatureSyntaxe::OperandeManquant)),
                };
                ops.push(SurPile::Op(index, unaire));
            }

            Lexeme::Operateur(op) => {
                let Some(tok) = binaire(op) else {
                    // parenthèses traitées plus haut
                    return Err(ErreurSyntaxe::new(index, NatureSyntaxe::OperandeInattendu));
                };

                // dépile tant que la précédence/associativité exige de sortir l’opérateur du haut
                while let Some(SurPile::Op(i, top)) = ops.last().copied() {
                    let p_top = precedence(top);
                    let p_tok = precedence(tok);

                    let doit_pop = if is_right_associative(tok) {
                        p_top > p_tok
                    } else {
                        p_top >= p_tok
                    };

                    if !doit_pop {
                        break;
                    }
                    ops.pop();
                    out.push(EtapeRpn { index: i, op: top });
                }

                ops.push(SurPile::Op(index, tok));
                attend_valeur = true;
            }
        }
    }

    // opérateur final (ou '(' seule) : il manque une valeur
    if attend_valeur {
        if let Some(dernier) = items.last() {
            return Err(ErreurSyntaxe::new(
                dernier.index,
                NatureSyntaxe::OperandeManquant,
            ));
        }
    }

    // vide la pile ops
    while let Some(s) = ops.pop() {
        match s {
            SurPile::ParOuvrante(i) => {
                return Err(ErreurSyntaxe::new(i, NatureSyntaxe::ParentheseNonFermee))
            }
            SurPile::Op(i, op) => out.push(EtapeRpn { index: i, op }),
        }
    }

    Ok(out)
}
