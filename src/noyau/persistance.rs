//! src/noyau/persistance.rs
//!
//! Persistance de la séquence (collaborateur externe, appelé explicitement).
//!
//! Format : tableau JSON ordonné d’enregistrements étiquetés par `kind` :
//!   {"kind":"number","value":42}
//!   {"kind":"variable","id":"…","name":"revenue","value":0[,"category":"finance"]}
//!   {"kind":"operator","symbol":"+"}
//!
//! Contrat : load(save(S)) == S, ids de variables compris.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::erreurs::{ErreurFormule, Resultat};
use super::jetons::{Jeton, Operateur};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Enregistrement {
    Number {
        value: f64,
    },
    Variable {
        id: String,
        name: String,
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
    },
    Operator {
        symbol: String,
    },
}

impl From<&Jeton> for Enregistrement {
    fn from(j: &Jeton) -> Self {
        match j {
            Jeton::Nombre { valeur } => Self::Number { value: *valeur },
            Jeton::Variable {
                id,
                nom,
                valeur,
                categorie,
            } => Self::Variable {
                id: id.clone(),
                name: nom.clone(),
                value: *valeur,
                category: categorie.clone(),
            },
            Jeton::Operateur(op) => Self::Operator {
                symbol: op.symbole().to_string(),
            },
        }
    }
}

impl TryFrom<Enregistrement> for Jeton {
    type Error = ErreurFormule;

    fn try_from(e: Enregistrement) -> Resultat<Self> {
        match e {
            Enregistrement::Number { value } => Ok(Jeton::nombre(value)),
            Enregistrement::Variable {
                id,
                name,
                value,
                category,
            } => Ok(Jeton::variable_avec_id(id, name, value, category)),
            Enregistrement::Operator { symbol } => {
                let mut c = symbol.chars();
                match (c.next(), c.next()) {
                    (Some(ch), None) => Operateur::depuis_char(ch)
                        .map(Jeton::Operateur)
                        .ok_or_else(|| symbole_invalide(&symbol)),
                    _ => Err(symbole_invalide(&symbol)),
                }
            }
        }
    }
}

fn symbole_invalide(symbol: &str) -> ErreurFormule {
    ErreurFormule::Persistance(format!("opérateur inconnu: {symbol:?}"))
}

pub fn serialiser(jetons: &[Jeton]) -> Resultat<String> {
    let enr: Vec<Enregistrement> = jetons.iter().map(Enregistrement::from).collect();
    serde_json::to_string_pretty(&enr)
        .map_err(|e| ErreurFormule::Persistance(format!("sérialisation: {e}")))
}

pub fn deserialiser(texte: &str) -> Resultat<Vec<Jeton>> {
    let enr: Vec<Enregistrement> = serde_json::from_str(texte)
        .map_err(|e| ErreurFormule::Persistance(format!("format invalide: {e}")))?;
    enr.into_iter().map(Jeton::try_from).collect()
}

/// Magasin clé-valeur de la séquence.
pub trait Stockage {
    fn save(&mut self, jetons: &[Jeton]) -> Resultat<()>;

    /// `None` : rien n’a encore été enregistré.
    fn load(&self) -> Resultat<Option<Vec<Jeton>>>;
}

/* ------------------------ Fichier JSON ------------------------ */

#[derive(Clone, Debug)]
pub struct StockageFichier {
    chemin: PathBuf,
}

impl StockageFichier {
    pub fn new(chemin: impl Into<PathBuf>) -> Self {
        Self {
            chemin: chemin.into(),
        }
    }
}

impl Stockage for StockageFichier {
    fn save(&mut self, jetons: &[Jeton]) -> Resultat<()> {
        let contenu = serialiser(jetons)?;

        if let Some(parent) = self.chemin.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ErreurFormule::Persistance(format!(
                    "création du dossier {}: {e}",
                    parent.display()
                ))
            })?;
        }

        fs::write(&self.chemin, contenu).map_err(|e| {
            ErreurFormule::Persistance(format!("écriture de {}: {e}", self.chemin.display()))
        })?;

        tracing::debug!(chemin = %self.chemin.display(), n = jetons.len(), "formule enregistrée");
        Ok(())
    }

    fn load(&self) -> Resultat<Option<Vec<Jeton>>> {
        if !self.chemin.exists() {
            tracing::debug!(chemin = %self.chemin.display(), "aucune formule enregistrée");
            return Ok(None);
        }

        let texte = fs::read_to_string(&self.chemin).map_err(|e| {
            ErreurFormule::Persistance(format!("lecture de {}: {e}", self.chemin.display()))
        })?;
        let jetons = deserialiser(&texte)?;

        tracing::info!(chemin = %self.chemin.display(), n = jetons.len(), "formule rechargée");
        Ok(Some(jetons))
    }
}

/* ------------------------ Mémoire ------------------------ */

/// Magasin en mémoire (web) ; passe quand même par le format JSON.
#[cfg(any(test, target_arch = "wasm32"))]
#[derive(Clone, Debug, Default)]
pub struct StockageMemoire {
    contenu: Option<String>,
}

#[cfg(any(test, target_arch = "wasm32"))]
impl StockageMemoire {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(any(test, target_arch = "wasm32"))]
impl Stockage for StockageMemoire {
    fn save(&mut self, jetons: &[Jeton]) -> Resultat<()> {
        self.contenu = Some(serialiser(jetons)?);
        Ok(())
    }

    fn load(&self) -> Resultat<Option<Vec<Jeton>>> {
        self.contenu.as_deref().map(deserialiser).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exemple() -> Vec<Jeton> {
        vec![
            Jeton::operateur('(').unwrap(),
            Jeton::variable("revenue", 1200.5),
            Jeton::operateur('-').unwrap(),
            Jeton::variable_avec_id("abc-7", "cost", 300.0, Some("finance".into())),
            Jeton::operateur(')').unwrap(),
            Jeton::operateur('^').unwrap(),
            Jeton::nombre(-0.25),
        ]
    }

    fn ids(jetons: &[Jeton]) -> Vec<Option<String>> {
        jetons.iter().map(|j| j.id().map(str::to_string)).collect()
    }

    #[test]
    fn aller_retour_exact() {
        let s = exemple();
        let relu = deserialiser(&serialiser(&s).unwrap()).unwrap();
        assert_eq!(relu, s);
        assert_eq!(ids(&relu), ids(&s));
    }

    #[test]
    fn flottants_relus_au_bit_pres() {
        // LCG déterministe sur les motifs de bits : toutes les magnitudes finies
        let mut x: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut valeurs = vec![0.1, 1.0 / 3.0, -1.1193133179981887e-17, 6.100029174392375e177];
        while valeurs.len() < 20_000 {
            x = x
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let v = f64::from_bits(x);
            if v.is_finite() {
                valeurs.push(v);
            }
        }

        let s: Vec<Jeton> = valeurs
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                if i % 2 == 0 {
                    Jeton::nombre(v)
                } else {
                    Jeton::variable("x", v)
                }
            })
            .collect();
        let relu = deserialiser(&serialiser(&s).unwrap()).unwrap();

        assert_eq!(relu.len(), s.len());
        for (a, b) in s.iter().zip(&relu) {
            let (va, vb) = (a.valeur().unwrap(), b.valeur().unwrap());
            assert_eq!(va.to_bits(), vb.to_bits(), "{va:e} relu {vb:e}");
        }
    }

    #[test]
    fn format_des_enregistrements() {
        let s = vec![
            Jeton::nombre(42.0),
            Jeton::variable_avec_id("v1", "revenue", 0.0, None),
            Jeton::operateur('*').unwrap(),
        ];
        let v: serde_json::Value = serde_json::from_str(&serialiser(&s).unwrap()).unwrap();
        assert_eq!(
            v,
            serde_json::json!([
                {"kind": "number", "value": 42.0},
                {"kind": "variable", "id": "v1", "name": "revenue", "value": 0.0},
                {"kind": "operator", "symbol": "*"}
            ])
        );
    }

    #[test]
    fn symbole_inconnu_refuse() {
        let texte = r#"[{"kind":"operator","symbol":"%"}]"#;
        assert!(matches!(
            deserialiser(texte),
            Err(ErreurFormule::Persistance(_))
        ));
        let texte = r#"[{"kind":"operator","symbol":"++"}]"#;
        assert!(deserialiser(texte).is_err());
        assert!(deserialiser("pas du json").is_err());
    }

    #[test]
    fn fichier_aller_retour() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = StockageFichier::new(dir.path().join("sous/dossier/formule.json"));
        assert_eq!(st.load().unwrap(), None);

        let s = exemple();
        st.save(&s).unwrap();
        let relu = st.load().unwrap().unwrap();
        assert_eq!(relu, s);
        assert_eq!(ids(&relu), ids(&s));

        st.save(&[]).unwrap();
        assert_eq!(st.load().unwrap(), Some(vec![]));
    }

    #[test]
    fn fichier_corrompu() {
        let dir = tempfile::tempdir().unwrap();
        let chemin = dir.path().join("formule.json");
        std::fs::write(&chemin, "{").unwrap();
        let st = StockageFichier::new(&chemin);
        assert!(matches!(st.load(), Err(ErreurFormule::Persistance(_))));
    }

    #[test]
    fn memoire_aller_retour() {
        let mut st = StockageMemoire::new();
        assert_eq!(st.load().unwrap(), None);
        let s = exemple();
        st.save(&s).unwrap();
        assert_eq!(st.load().unwrap(), Some(s));
    }
}
