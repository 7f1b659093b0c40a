//! File classification and precedence ordering.
//!
//! Grounded in the original Go implementation's `utils.go` (`isTerraformTfvarsFile`,
//! `isValidVariableFile`, `createPrioritisableFile`, `orderFilesByPriority`).

/// The synthetic filename the CLI host uses for `TF_VAR_*` environment variables it injects
/// into the file map before handing it to [`crate::hcl::driver::parse_module`]. Recognized here
/// by exact name so it slots into the precedence chain right after `.tf` defaults.
pub const ENV_VAR_FILENAME: &str = "<env>";

/// How a single filename was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    /// A `.tf` configuration file.
    Tf,
    /// `TF_VAR_*` environment variables, applied after `.tf` defaults but before any tfvars file.
    EnvVar,
    /// `terraform.tfvars`, applied after all `.tf` defaults and environment variables.
    DefaultTfvars,
    /// `*.auto.tfvars`, applied after `terraform.tfvars`, in lexical filename order.
    AutoTfvars,
    /// Anything else — not read for variables, not serialized.
    Irrelevant,
}

/// Classifies `filename` by its base name (the component after the last `/` or `\`).
pub fn classify(filename: &str) -> FileClass {
    let base = base_name(filename);

    if base == ENV_VAR_FILENAME {
        FileClass::EnvVar
    } else if base == "terraform.tfvars" {
        FileClass::DefaultTfvars
    } else if base.ends_with(".auto.tfvars") {
        FileClass::AutoTfvars
    } else if base.ends_with(".tf") {
        FileClass::Tf
    } else {
        FileClass::Irrelevant
    }
}

fn base_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
}

fn priority(class: FileClass) -> u8 {
    match class {
        FileClass::Irrelevant => 0,
        FileClass::Tf => 1,
        FileClass::EnvVar => 2,
        FileClass::DefaultTfvars => 3,
        FileClass::AutoTfvars => 4,
    }
}

/// Orders `filenames` so that merging variable assignments left-to-right yields Terraform's
/// documented precedence: irrelevant files first (lowest, effectively never contribute),
/// `.tf` defaults next, then `terraform.tfvars`, then `*.auto.tfvars` sorted lexically.
///
/// Files of equal priority other than `*.auto.tfvars` keep their relative input order.
pub fn order_by_precedence(filenames: &[String]) -> Vec<String> {
    let mut indexed: Vec<(usize, &String)> = filenames.iter().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| {
        let pa = priority(classify(a));
        let pb = priority(classify(b));
        pa.cmp(&pb).then_with(|| {
            if pa == priority(FileClass::AutoTfvars) {
                a.cmp(b)
            } else {
                ia.cmp(ib)
            }
        })
    });
    indexed.into_iter().map(|(_, f)| f.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_base_name() {
        assert_eq!(classify("main.tf"), FileClass::Tf);
        assert_eq!(classify("terraform.tfvars"), FileClass::DefaultTfvars);
        assert_eq!(classify("modules/a/terraform.tfvars"), FileClass::DefaultTfvars);
        assert_eq!(classify("prod.auto.tfvars"), FileClass::AutoTfvars);
        assert_eq!(classify("README.md"), FileClass::Irrelevant);
        assert_eq!(classify("terraform.tfvars.json"), FileClass::Irrelevant);
        assert_eq!(classify("a.auto.tfvars.json"), FileClass::Irrelevant);
    }

    #[test]
    fn orders_auto_tfvars_lexically() {
        let files = vec![
            "a.tf".to_string(),
            "b.auto.tfvars".to_string(),
            "a.auto.tfvars".to_string(),
            "terraform.tfvars".to_string(),
        ];
        let ordered = order_by_precedence(&files);
        assert_eq!(
            ordered,
            vec![
                "a.tf".to_string(),
                "terraform.tfvars".to_string(),
                "a.auto.tfvars".to_string(),
                "b.auto.tfvars".to_string(),
            ]
        );
    }
}
