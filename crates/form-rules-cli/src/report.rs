use form_rules::{GraphValidation, RuleDiagnostic, Severity, ValidationResult};

pub fn describe_graph(validation: &GraphValidation) {
    println!(
        "Visibility rules: {}",
        if validation.is_valid { "valid" } else { "invalid" }
    );
    if validation.diagnostics.is_empty() {
        return;
    }
    println!("Diagnostics:");
    for diagnostic in &validation.diagnostics {
        println!("  {}", diagnostic_line(diagnostic));
    }
}

fn diagnostic_line(diagnostic: &RuleDiagnostic) -> String {
    let severity = match diagnostic.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    format!(
        "[{severity}] {} - {}",
        diagnostic.field_id, diagnostic.message
    )
}

pub fn describe_validation(result: &ValidationResult) {
    println!(
        "Validation result: {}",
        if result.is_valid { "valid" } else { "invalid" }
    );
    if result.errors.is_empty() {
        return;
    }
    println!("Errors:");
    for error in &result.errors {
        println!("  {} - {} ({})", error.field_id, error.message, error.code);
    }
}

pub fn describe_fields(label: &str, ids: &[&str]) {
    if ids.is_empty() {
        println!("{label}: none");
    } else {
        println!("{label}: {}", ids.join(", "));
    }
}
