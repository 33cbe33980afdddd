use crate::config::*;

/// The accuracy of one field over all the scored forms.
#[derive(PartialEq, Debug, Clone)]
pub struct FieldReport {
    pub index: usize,
    pub name: String,
    pub category: Category,
    pub result: ComparisonResult,
}

impl FieldReport {
    pub fn percentage(&self) -> Option<f64> {
        self.result.percentage()
    }
}

/// The final numbers of a run, ready to be printed.
#[derive(PartialEq, Debug, Clone)]
pub struct AccuracyReport {
    pub fields: Vec<FieldReport>,
    /// Subtotals for every category that has at least one field.
    pub categories: Vec<(Category, ComparisonResult)>,
    pub overall: ComparisonResult,
    pub forms_scored: u64,
    pub num_matching: usize,
    pub num_only_expected: usize,
    pub num_only_actual: usize,
}

impl AccuracyReport {
    /// Folds the tally of a reconciliation into field and category totals.
    ///
    /// Panics if the tally was not computed with this form.
    pub fn new(rec: &Reconciliation, form: &FormSpec) -> AccuracyReport {
        assert_eq!(rec.tally.fields.len(), form.len());

        let fields: Vec<FieldReport> = form
            .fields
            .iter()
            .zip(rec.tally.fields.iter())
            .enumerate()
            .map(|(index, (spec, result))| FieldReport {
                index,
                name: spec.name.clone(),
                category: spec.category(),
                result: *result,
            })
            .collect();

        let categories: Vec<(Category, ComparisonResult)> = Category::ALL
            .iter()
            .filter(|cat| fields.iter().any(|f| f.category == **cat))
            .map(|cat| {
                let subtotal: ComparisonResult = fields
                    .iter()
                    .filter(|f| f.category == *cat)
                    .map(|f| f.result)
                    .sum();
                (*cat, subtotal)
            })
            .collect();

        AccuracyReport {
            overall: rec.tally.overall(),
            fields,
            categories,
            forms_scored: rec.tally.forms_scored,
            num_matching: rec.matching.len(),
            num_only_expected: rec.only_expected.len(),
            num_only_actual: rec.only_actual.len(),
        }
    }

    pub fn category(&self, cat: Category) -> Option<ComparisonResult> {
        self.categories
            .iter()
            .find(|(c, _)| *c == cat)
            .map(|(_, r)| *r)
    }
}
