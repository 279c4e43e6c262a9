//! `optimus calc`: Evaluate an arithmetic expression with the same
//! evaluator the agent's calculator uses.

pub fn run(expression: &str) -> Result<(), Box<dyn std::error::Error>> {
    let value = optimus_tools::evaluate(expression)?;
    println!("{}", format_value(value));
    Ok(())
}

/// Integral results print without a fractional part.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_values_print_plainly() {
        assert_eq!(format_value(7.0), "7");
        assert_eq!(format_value(-3.0), "-3");
        assert_eq!(format_value(2.5), "2.5");
    }

    #[test]
    fn invalid_expression_is_an_error() {
        assert!(run("2 +").is_err());
        assert!(run("__import__('os')").is_err());
    }
}
