//! Tests fuzz safe : robustesse + déterminisme + limites contrôlées.
//!
//! But : marteler le pipeline sans brûler la machine.
//! - RNG déterministe (seed fixe)
//! - profondeur bornée
//! - budget temps global
//! - invariant clé : une séquence bien formée s’évalue toujours, et toujours pareil
//! - invariant clé : une erreur désigne un jeton qui existe

use std::time::{Duration, Instant};

use super::eval::eval_sequence;
use super::jetons::Jeton;

/* ------------------------ RNG déterministe minimal ------------------------ */

#[derive(Clone)]
struct Rng {
    state: u64,
}
impl Rng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }
    fn next_u32(&mut self) -> u32 {
        // LCG simple (déterministe)
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }
    fn pick(&mut self, n: u32) -> u32 {
        if n == 0 {
            0
        } else {
            self.next_u32() % n
        }
    }
    fn coin(&mut self) -> bool {
        (self.next_u32() & 1) == 1
    }
}

/* ------------------------ Budget anti-gel ------------------------ */

fn budget(start: Instant, max: Duration) {
    if start.elapsed() > max {
        panic!("budget temps dépassé: {:?}", max);
    }
}

/* ------------------------ Génération (bornée) ------------------------ */

fn op(c: char) -> Jeton {
    Jeton::operateur(c).expect("opérateur de test")
}

fn gen_valeur(rng: &mut Rng) -> f64 {
    // inclut 0 (divisions par zéro voulues) et des négatifs (puissances NaN voulues)
    const VALEURS: [f64; 9] = [0.0, 1.0, 2.0, 3.0, 0.5, 10.0, -2.0, 7.25, 1e3];
    VALEURS[rng.pick(VALEURS.len() as u32) as usize]
}

fn gen_atome(rng: &mut Rng) -> (Vec<Jeton>, f64) {
    let v = gen_valeur(rng);
    let j = if rng.coin() {
        Jeton::nombre(v)
    } else {
        Jeton::variable(format!("v{}", rng.pick(5)), v)
    };
    (vec![j], v)
}

/// Expression entièrement parenthésée + sa valeur attendue, calculée avec les
/// mêmes opérations f64 dans le même ordre.
fn gen_expr(rng: &mut Rng, depth: usize) -> (Vec<Jeton>, f64) {
    if depth == 0 {
        return gen_atome(rng);
    }

    match rng.pick(7) {
        0 => gen_atome(rng),
        1 => {
            let (mut s, v) = gen_expr(rng, depth - 1);
            // "(-(x))" : sans la parenthèse externe, "-(x)^b" vaudrait -(x^b)
            let mut out = vec![op('('), op('-'), op('(')];
            out.append(&mut s);
            out.push(op(')'));
            out.push(op(')'));
            (out, -v)
        }
        k => {
            let (mut a, va) = gen_expr(rng, depth - 1);
            let (mut b, vb) = gen_expr(rng, depth - 1);
            let (c, v) = match k {
                2 => ('+', va + vb),
                3 => ('-', va - vb),
                4 => ('*', va * vb),
                5 => ('/', va / vb),
                _ => ('^', va.powf(vb)),
            };
            let mut out = vec![op('(')];
            out.append(&mut a);
            out.push(op(c));
            out.append(&mut b);
            out.push(op(')'));
            (out, v)
        }
    }
}

fn meme_f64(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
}

/* ------------------------ Tests ------------------------ */

#[test]
fn fuzz_safe_bien_formees_toujours_evaluees() {
    let t0 = Instant::now();
    let max = Duration::from_millis(500);

    let mut rng = Rng::new(0xC0FFEE_u64);
    let mut vus_speciaux = 0usize;

    for _ in 0..300 {
        budget(t0, max);

        let (seq, attendu) = gen_expr(&mut rng, 5);
        let v1 = eval_sequence(&seq).unwrap_or_else(|e| panic!("seq={seq:?} err={e}"));
        let v2 = eval_sequence(&seq).unwrap_or_else(|e| panic!("seq={seq:?} err={e}"));

        assert!(meme_f64(v1, v2), "non déterministe: {v1} / {v2}");
        assert!(meme_f64(v1, attendu), "seq={seq:?} obtenu={v1} attendu={attendu}");

        if !v1.is_finite() {
            vus_speciaux += 1;
        }
    }

    // ∞ et NaN doivent apparaître : sinon le fuzz ne “balaye” rien
    assert!(vus_speciaux > 0, "aucune valeur spéciale IEEE vue");
}

#[test]
fn fuzz_safe_soupe_de_jetons() {
    let t0 = Instant::now();
    let max = Duration::from_millis(300);

    let mut rng = Rng::new(0xBADC0DE_u64);
    let symboles = ['+', '-', '*', '/', '^', '(', ')'];

    let mut seen_ok = 0usize;
    let mut seen_err = 0usize;

    for _ in 0..2000 {
        budget(t0, max);

        let len = rng.pick(12) as usize;
        let seq: Vec<Jeton> = (0..len)
            .map(|_| {
                if rng.pick(3) == 0 {
                    gen_atome(&mut rng).0.remove(0)
                } else {
                    op(symboles[rng.pick(7) as usize])
                }
            })
            .collect();

        let ouvrantes = seq.iter().filter(|j| **j == op('(')).count();
        let fermantes = seq.iter().filter(|j| **j == op(')')).count();

        match eval_sequence(&seq) {
            Ok(_) => {
                assert_eq!(ouvrantes, fermantes, "acceptée mais déséquilibrée: {seq:?}");
                seen_ok += 1;
            }
            Err(e) => {
                assert!(e.index < seq.len(), "index hors séquence: {e:?} pour {seq:?}");
                seen_err += 1;
            }
        }
    }

    assert!(seen_ok > 10, "trop peu de succès: {seen_ok}");
    assert!(seen_err > 10, "trop peu d’erreurs: {seen_err}");
}

#[test]
fn fuzz_safe_longue_chaine_anti_pile() {
    let t0 = Instant::now();
    let max = Duration::from_millis(300);

    let mut seq = vec![Jeton::nombre(0.5)];
    for _ in 0..5000 {
        seq.push(op('+'));
        seq.push(Jeton::nombre(0.5));
    }
    assert_eq!(eval_sequence(&seq), Ok(2500.5));

    // 3000 parenthèses imbriquées : aucun appel récursif dans le pipeline
    let mut imbrique = vec![op('('); 3000];
    imbrique.push(Jeton::nombre(4.0));
    imbrique.extend(std::iter::repeat_with(|| op(')')).take(3000));
    assert_eq!(eval_sequence(&imbrique), Ok(4.0));

    budget(t0, max);
}
