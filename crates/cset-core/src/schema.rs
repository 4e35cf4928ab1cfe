use bimap::BiHashMap;
use indexmap::IndexSet;
use tracing::debug;

use crate::error::CsetError;

/// A finite relational schema: table names, arrow names with their
/// source/target tables, attribute-domain names, and attribute-arrow names
/// with their source table and target domain.
///
/// Tables, arrows, domains, and attribute arrows are each assigned a dense
/// `usize` index equal to their declaration order; that index, not the
/// name, is what every other module in the engine works with. Names exist
/// only at the boundary (construction and error messages).
#[derive(Debug, Clone)]
pub struct Schema {
    table_names: IndexSet<String>,
    table_index: BiHashMap<String, usize>,
    arrow_names: IndexSet<String>,
    arrow_index: BiHashMap<String, usize>,
    arrow_src: Vec<usize>,
    arrow_tgt: Vec<usize>,
    domain_names: IndexSet<String>,
    attr_arrow_names: IndexSet<String>,
    attr_arrow_index: BiHashMap<String, usize>,
    attr_arrow_src: Vec<usize>,
    attr_arrow_domain: Vec<usize>,
}

impl Schema {
    /// Builds a schema from its declaration lists, validating that every
    /// name is unique and every `src`/`tgt`/domain reference resolves.
    pub fn new(
        tables: impl IntoIterator<Item = impl Into<String>>,
        arrows: impl IntoIterator<Item = (impl Into<String>, impl Into<String>, impl Into<String>)>,
        domains: impl IntoIterator<Item = impl Into<String>>,
        attr_arrows: impl IntoIterator<Item = (impl Into<String>, impl Into<String>, impl Into<String>)>,
    ) -> Result<Self, CsetError> {
        let mut table_names = IndexSet::new();
        for t in tables {
            let t = t.into();
            if !table_names.insert(t.clone()) {
                return Err(CsetError::InvalidSchema(format!(
                    "duplicate table name {t:?}"
                )));
            }
        }
        let table_index: BiHashMap<String, usize> = table_names
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        let mut domain_names = IndexSet::new();
        for d in domains {
            let d = d.into();
            if table_names.contains(&d) {
                return Err(CsetError::InvalidSchema(format!(
                    "name {d:?} used for both a table and an attribute domain"
                )));
            }
            if !domain_names.insert(d.clone()) {
                return Err(CsetError::InvalidSchema(format!(
                    "duplicate attribute domain name {d:?}"
                )));
            }
        }

        let mut arrow_names = IndexSet::new();
        let mut arrow_src = Vec::new();
        let mut arrow_tgt = Vec::new();
        for (name, src, tgt) in arrows {
            let name = name.into();
            let src = src.into();
            let tgt = tgt.into();
            if !arrow_names.insert(name.clone()) {
                return Err(CsetError::InvalidSchema(format!(
                    "duplicate arrow name {name:?}"
                )));
            }
            let src_idx = *table_index.get_by_left(&src).ok_or_else(|| {
                CsetError::InvalidSchema(format!(
                    "arrow {name:?} has unknown source table {src:?}"
                ))
            })?;
            let tgt_idx = *table_index.get_by_left(&tgt).ok_or_else(|| {
                CsetError::InvalidSchema(format!(
                    "arrow {name:?} has unknown target table {tgt:?}"
                ))
            })?;
            arrow_src.push(src_idx);
            arrow_tgt.push(tgt_idx);
        }
        let arrow_index: BiHashMap<String, usize> = arrow_names
            .iter()
            .enumerate()
            .map(|(i, a)| (a.clone(), i))
            .collect();

        let domain_index: BiHashMap<String, usize> = domain_names
            .iter()
            .enumerate()
            .map(|(i, d)| (d.clone(), i))
            .collect();

        let mut attr_arrow_names = IndexSet::new();
        let mut attr_arrow_src = Vec::new();
        let mut attr_arrow_domain = Vec::new();
        for (name, src, domain) in attr_arrows {
            let name = name.into();
            let src = src.into();
            let domain = domain.into();
            if arrow_names.contains(&name) {
                return Err(CsetError::InvalidSchema(format!(
                    "name {name:?} used for both an arrow and an attribute arrow"
                )));
            }
            if !attr_arrow_names.insert(name.clone()) {
                return Err(CsetError::InvalidSchema(format!(
                    "duplicate attribute arrow name {name:?}"
                )));
            }
            let src_idx = *table_index.get_by_left(&src).ok_or_else(|| {
                CsetError::InvalidSchema(format!(
                    "attribute arrow {name:?} has unknown source table {src:?}"
                ))
            })?;
            let dom_idx = *domain_index.get_by_left(&domain).ok_or_else(|| {
                CsetError::InvalidSchema(format!(
                    "attribute arrow {name:?} has unknown domain {domain:?}"
                ))
            })?;
            attr_arrow_src.push(src_idx);
            attr_arrow_domain.push(dom_idx);
        }
        let attr_arrow_index: BiHashMap<String, usize> = attr_arrow_names
            .iter()
            .enumerate()
            .map(|(i, a)| (a.clone(), i))
            .collect();

        debug!(
            tables = table_names.len(),
            arrows = arrow_names.len(),
            domains = domain_names.len(),
            attr_arrows = attr_arrow_names.len(),
            "schema built"
        );
        Ok(Schema {
            table_names,
            table_index,
            arrow_names,
            arrow_index,
            arrow_src,
            arrow_tgt,
            domain_names,
            attr_arrow_names,
            attr_arrow_index,
            attr_arrow_src,
            attr_arrow_domain,
        })
    }

    pub fn table_count(&self) -> usize {
        self.table_names.len()
    }

    pub fn arrow_count(&self) -> usize {
        self.arrow_names.len()
    }

    pub fn domain_count(&self) -> usize {
        self.domain_names.len()
    }

    pub fn attr_arrow_count(&self) -> usize {
        self.attr_arrow_names.len()
    }

    pub fn tables(&self) -> impl Iterator<Item = usize> {
        0..self.table_count()
    }

    pub fn arrows(&self) -> impl Iterator<Item = usize> {
        0..self.arrow_count()
    }

    pub fn domains(&self) -> impl Iterator<Item = usize> {
        0..self.domain_count()
    }

    pub fn attr_arrows(&self) -> impl Iterator<Item = usize> {
        0..self.attr_arrow_count()
    }

    pub fn table_name(&self, t: usize) -> &str {
        self.table_index
            .get_by_right(&t)
            .expect("table index in range")
    }

    pub fn arrow_name(&self, a: usize) -> &str {
        self.arrow_index
            .get_by_right(&a)
            .expect("arrow index in range")
    }

    pub fn table_index_of(&self, name: &str) -> Option<usize> {
        self.table_index.get_by_left(name).copied()
    }

    pub fn src(&self, a: usize) -> usize {
        self.arrow_src[a]
    }

    pub fn tgt(&self, a: usize) -> usize {
        self.arrow_tgt[a]
    }

    pub fn attr_src(&self, alpha: usize) -> usize {
        self.attr_arrow_src[alpha]
    }

    pub fn attr_domain(&self, alpha: usize) -> usize {
        self.attr_arrow_domain[alpha]
    }

    pub fn attr_arrow_name(&self, alpha: usize) -> &str {
        self.attr_arrow_index
            .get_by_right(&alpha)
            .expect("attribute arrow index in range")
    }

    pub fn domain_name(&self, d: usize) -> &str {
        self.domain_names.get_index(d).expect("domain index in range")
    }

    /// Arrows (ordinary or attribute) with source table `t`.
    pub fn out_arrows(&self, t: usize) -> impl Iterator<Item = usize> + '_ {
        self.arrows().filter(move |&a| self.src(a) == t)
    }

    /// Arrows with target table `t`.
    pub fn in_arrows(&self, t: usize) -> impl Iterator<Item = usize> + '_ {
        self.arrows().filter(move |&a| self.tgt(a) == t)
    }

    pub fn attr_out_arrows(&self, t: usize) -> impl Iterator<Item = usize> + '_ {
        self.attr_arrows().filter(move |&alpha| self.attr_src(alpha) == t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn builds_a_valid_schema() {
        let schema = Schema::new(
            ["V", "E"],
            [("src", "E", "V"), ("tgt", "E", "V")],
            ["Label"],
            [("dec", "E", "Label")],
        )
        .unwrap();
        assert_eq!(schema.table_count(), 2);
        assert_eq!(schema.arrow_count(), 2);
        assert_eq!(schema.domain_count(), 1);
        assert_eq!(schema.attr_arrow_count(), 1);
        assert_eq!(schema.table_name(schema.src(0)), "E");
        assert_eq!(schema.table_name(schema.tgt(0)), "V");
    }

    #[test]
    fn rejects_duplicate_table_names() {
        let err = Schema::new(["V", "V"], [] as [(String, String, String); 0], [] as [String; 0], [] as [(String, String, String); 0])
            .unwrap_err();
        assert!(matches!(err, CsetError::InvalidSchema(_)));
    }

    #[test]
    fn rejects_unknown_arrow_endpoint() {
        let err = Schema::new(["V"], [("e", "V", "W")], [] as [String; 0], [] as [(String, String, String); 0])
            .unwrap_err();
        assert!(matches!(err, CsetError::InvalidSchema(_)));
    }
}
