use crate::digits::{digits_to_number, number_to_digits, MAX_OPERAND};
use crate::error::{Result, TrainerError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of multipliers the trainer has rules for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(into = "u32", try_from = "u32")]
pub enum Multiplier {
    #[strum(to_string = "×2")]
    Two,
    #[strum(to_string = "×3")]
    Three,
    #[strum(to_string = "×4")]
    Four,
    #[strum(to_string = "×5")]
    Five,
    #[strum(to_string = "×6")]
    Six,
    #[strum(to_string = "×7")]
    Seven,
    #[strum(to_string = "×8")]
    Eight,
    #[strum(to_string = "×9")]
    Nine,
    #[strum(to_string = "×11")]
    Eleven,
    #[strum(to_string = "×12")]
    Twelve,
}

impl Multiplier {
    pub const ALL: [Multiplier; 10] = [
        Self::Two,
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Six,
        Self::Seven,
        Self::Eight,
        Self::Nine,
        Self::Eleven,
        Self::Twelve,
    ];

    pub fn value(self) -> u32 {
        match self {
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
            Self::Nine => 9,
            Self::Eleven => 11,
            Self::Twelve => 12,
        }
    }

    /// Look up the rule for a raw multiplier value.
    pub fn from_value(value: u32) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.value() == value)
            .ok_or(TrainerError::UnsupportedMultiplier(value))
    }

    fn is_three_way(self) -> bool {
        matches!(self, Self::Three | Self::Four | Self::Eight | Self::Nine)
    }

    /// Base term for one position, before the incoming carry is added.
    fn position_term(self, edge: Edge, d: u8, n: u8) -> (i32, String) {
        let d32 = i32::from(d);
        let n32 = i32::from(n);
        let five = if d % 2 == 1 { 5 } else { 0 };
        let half = n32 / 2;

        match (self, edge) {
            (Self::Two, _) => (2 * d32, format!("2×{d}")),
            (Self::Eleven, _) => (d32 + n32, format!("{d} + {n}")),
            (Self::Twelve, _) => (2 * d32 + n32, format!("2×{d} + {n}")),
            (Self::Five, _) => (five + half, format!("{five} + ⌊{n}/2⌋")),
            (Self::Six, _) => (d32 + five + half, format!("{d} + {five} + ⌊{n}/2⌋")),
            (Self::Seven, _) => (
                2 * d32 + five + half,
                format!("2×{d} + {five} + ⌊{n}/2⌋"),
            ),
            (Self::Three, Edge::Rightmost) => {
                ((10 - d32) * 2 + five, format!("(10 - {d})×2 + {five}"))
            }
            (Self::Three, Edge::Middle) => (
                (9 - d32) * 2 + five + half,
                format!("(9 - {d})×2 + {five} + ⌊{n}/2⌋"),
            ),
            (Self::Four, Edge::Rightmost) => ((10 - d32) + five, format!("(10 - {d}) + {five}")),
            (Self::Four, Edge::Middle) => (
                (9 - d32) + half + five,
                format!("(9 - {d}) + ⌊{n}/2⌋ + {five}"),
            ),
            (Self::Eight, Edge::Rightmost) => ((10 - d32) * 2, format!("(10 - {d})×2")),
            (Self::Eight, Edge::Middle) => {
                ((9 - d32) * 2 + n32, format!("(9 - {d})×2 + {n}"))
            }
            (Self::Nine, Edge::Rightmost) => (10 - d32, format!("10 - {d}")),
            (Self::Nine, Edge::Middle) => (9 - d32 + n32, format!("9 - {d} + {n}")),
        }
    }

    /// Leftmost term of a three-way rule, from the operand's most significant digit.
    fn leftmost_term(self, d0: u8) -> (i32, String) {
        let d = i32::from(d0);
        match self {
            Self::Three => (d / 2 - 2, format!("⌊{d0}/2⌋ - 2")),
            Self::Four => (d / 2 - 1, format!("⌊{d0}/2⌋ - 1")),
            Self::Eight => (d - 2, format!("{d0} - 2")),
            _ => (d - 1, format!("{d0} - 1")),
        }
    }

    fn trace(self, operand: u64) -> StepTrace {
        if self.is_three_way() {
            self.trace_three_way(operand)
        } else {
            self.trace_uniform(operand)
        }
    }

    fn trace_uniform(self, operand: u64) -> StepTrace {
        let mut digits = vec![0];
        digits.extend(number_to_digits(operand));

        let mut steps = Vec::with_capacity(digits.len());
        let mut result_digits = Vec::with_capacity(digits.len() + 1);
        let mut carry = 0u8;

        for i in (0..digits.len()).rev() {
            let neighbour = digits.get(i + 1).copied().unwrap_or(0);
            let (base, expr) = self.position_term(Edge::Middle, digits[i], neighbour);
            let step = Step::combine(digits.len() - i - 1, base, &expr, carry);
            result_digits.push(step.digit);
            carry = step.new_carry;
            steps.push(step);
        }

        if carry > 0 {
            result_digits.push(carry);
        }
        result_digits.reverse();
        while result_digits.len() > 1 && result_digits[0] == 0 {
            result_digits.remove(0);
        }

        StepTrace {
            steps,
            result: digits_to_number(&result_digits),
        }
    }

    fn trace_three_way(self, operand: u64) -> StepTrace {
        let digits = number_to_digits(operand);
        let last = digits.len() - 1;

        let mut steps = Vec::with_capacity(digits.len() + 1);
        let mut result_digits = Vec::with_capacity(digits.len() + 1);
        let mut carry = 0u8;

        for i in (0..digits.len()).rev() {
            let (edge, neighbour) = if i == last {
                (Edge::Rightmost, 0)
            } else {
                (Edge::Middle, digits[i + 1])
            };
            let (base, expr) = self.position_term(edge, digits[i], neighbour);
            let step = Step::combine(last - i, base, &expr, carry);
            result_digits.push(step.digit);
            carry = step.new_carry;
            steps.push(step);
        }
        result_digits.reverse();

        let (base, expr) = self.leftmost_term(digits[0]);
        let leftmost = base + i32::from(carry);
        let emitted = leftmost > 0;
        steps.push(Step {
            position: digits.len(),
            calculation: format!("{expr}{} = {leftmost}", carry_suffix(carry)),
            digit: leftmost.clamp(0, 9) as u8,
            new_carry: 0,
            emitted,
        });

        let mut result = digits_to_number(&result_digits);
        if emitted {
            result += leftmost as u64 * 10u64.pow(digits.len() as u32);
        }

        StepTrace { steps, result }
    }
}

impl From<Multiplier> for u32 {
    fn from(m: Multiplier) -> Self {
        m.value()
    }
}

impl TryFrom<u32> for Multiplier {
    type Error = TrainerError;

    fn try_from(value: u32) -> Result<Self> {
        Self::from_value(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Rightmost,
    Middle,
}

fn carry_suffix(carry: u8) -> String {
    if carry > 0 {
        format!(" + {carry}")
    } else {
        String::new()
    }
}

/// One digit position of a worked solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// 0 is the rightmost result digit.
    pub position: usize,
    pub calculation: String,
    pub digit: u8,
    pub new_carry: u8,
    /// False only for a three-way leftmost value that was not positive.
    #[serde(default = "emitted_default")]
    pub emitted: bool,
}

fn emitted_default() -> bool {
    true
}

impl Step {
    fn combine(position: usize, base: i32, expr: &str, carry: u8) -> Self {
        let sum = base + i32::from(carry);
        Self {
            position,
            calculation: format!("{expr}{} = {sum}", carry_suffix(carry)),
            digit: (sum % 10) as u8,
            new_carry: (sum / 10) as u8,
            emitted: true,
        }
    }

    pub fn has_carry(&self) -> bool {
        self.new_carry > 0
    }
}

/// Steps in right-to-left processing order plus the assembled product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTrace {
    pub steps: Vec<Step>,
    pub result: u64,
}

impl StepTrace {
    /// Number of positions that pushed a carry into the next one.
    pub fn carry_count(&self) -> usize {
        count_carries(&self.steps)
    }

    /// Steps reordered most significant first, for left-to-right display.
    pub fn left_to_right(&self) -> impl Iterator<Item = &Step> {
        let mut ordered: Vec<&Step> = self.steps.iter().collect();
        ordered.sort_by(|a, b| b.position.cmp(&a.position));
        ordered.into_iter()
    }
}

pub fn count_carries(steps: &[Step]) -> usize {
    steps.iter().filter(|s| s.has_carry()).count()
}

/// Shared interface over the per-multiplier rules.
pub trait Rule {
    fn name(&self) -> String;
    fn hint(&self) -> &'static str;
    /// Ground-truth product by direct multiplication.
    fn calculate(&self, operand: u64) -> Result<u64>;
    /// Digit-by-digit derivation of the product.
    fn show_steps(&self, operand: u64) -> Result<StepTrace>;
}

fn check_operand(operand: u64) -> Result<()> {
    if operand > MAX_OPERAND {
        return Err(TrainerError::OperandOutOfRange {
            operand,
            max: MAX_OPERAND,
        });
    }
    Ok(())
}

impl Rule for Multiplier {
    fn name(&self) -> String {
        self.to_string()
    }

    fn hint(&self) -> &'static str {
        match self {
            Self::Two => "Double each digit",
            Self::Three => {
                "Subtract from 10 (rightmost) or 9 (middle), double, add 5 if odd, add half neighbor"
            }
            Self::Four => "Subtract from 10 (rightmost) or 9 (middle), add ⌊neighbor/2⌋, add 5 if odd",
            Self::Five => "5 if digit odd + ⌊right neighbor/2⌋",
            Self::Six => "Add 5 if digit odd + ⌊right neighbor/2⌋",
            Self::Seven => "2×digit + 5 if digit odd + ⌊right neighbor/2⌋",
            Self::Eight => "Subtract from 10 (rightmost) or 9 (middle), double, add neighbor",
            Self::Nine => {
                "Subtract from 10 (rightmost), subtract from 9 and add neighbor (middle), reduce leftmost by 1"
            }
            Self::Eleven => "Add the neighbor (right digit)",
            Self::Twelve => "2×digit + neighbor",
        }
    }

    fn calculate(&self, operand: u64) -> Result<u64> {
        check_operand(operand)?;
        Ok(operand * u64::from(self.value()))
    }

    fn show_steps(&self, operand: u64) -> Result<StepTrace> {
        check_operand(operand)?;
        Ok(self.trace(operand))
    }
}

/// A step trace checked against direct multiplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkedSolution {
    pub rule: String,
    pub steps: Vec<Step>,
    pub procedure_result: u64,
    pub calculator_result: u64,
    pub procedure_matches: bool,
}

impl WorkedSolution {
    pub fn new<R: Rule + ?Sized>(rule: &R, operand: u64) -> Result<Self> {
        let trace = rule.show_steps(operand)?;
        let expected = rule.calculate(operand)?;
        let procedure_matches = trace.result == expected;
        if !procedure_matches {
            tracing::warn!(
                rule = %rule.name(),
                operand,
                procedure = trace.result,
                expected,
                "procedure mismatch"
            );
        }

        Ok(Self {
            rule: rule.name(),
            steps: trace.steps,
            procedure_result: trace.result,
            calculator_result: expected,
            procedure_matches,
        })
    }
}

impl fmt::Display for WorkedSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Trachtenberg Method ({}):", self.rule)?;
        for step in &self.steps {
            write!(
                f,
                "Position {}: {} → digit: {}",
                step.position, step.calculation, step.digit
            )?;
            if step.new_carry > 0 {
                write!(f, ", carry: {}", step.new_carry)?;
            }
            writeln!(f)?;
        }
        write!(f, "Procedure result: {}", self.procedure_result)?;
        if !self.procedure_matches {
            write!(f, " ⚠ Procedure mismatch!")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits_of(trace: &StepTrace) -> Vec<(u8, u8)> {
        trace.steps.iter().map(|s| (s.digit, s.new_carry)).collect()
    }

    #[test]
    fn test_lookup_by_value() {
        for m in Multiplier::ALL {
            assert_eq!(Multiplier::from_value(m.value()).unwrap(), m);
        }
        assert!(Multiplier::from_value(10).is_err());
        assert!(Multiplier::from_value(1).is_err());
        assert!(Multiplier::from_value(13).is_err());
    }

    #[test]
    fn test_names() {
        assert_eq!(Multiplier::Eleven.name(), "×11");
        assert_eq!(Multiplier::Two.to_string(), "×2");
    }

    #[test]
    fn test_eleven_on_34() {
        let trace = Multiplier::Eleven.show_steps(34).unwrap();
        assert_eq!(trace.result, 374);
        assert_eq!(digits_of(&trace), vec![(4, 0), (7, 0), (3, 0)]);
        assert_eq!(trace.steps[0].calculation, "4 + 0 = 4");
        assert_eq!(trace.steps[1].calculation, "3 + 4 = 7");
        assert_eq!(trace.steps[2].calculation, "0 + 3 = 3");
    }

    #[test]
    fn test_eleven_on_78() {
        let trace = Multiplier::Eleven.show_steps(78).unwrap();
        assert_eq!(trace.result, 858);
        assert_eq!(digits_of(&trace), vec![(8, 0), (5, 1), (8, 0)]);
        assert_eq!(trace.steps[1].calculation, "7 + 8 = 15");
        assert_eq!(trace.steps[2].calculation, "0 + 7 + 1 = 8");
    }

    #[test]
    fn test_nine_on_23() {
        let trace = Multiplier::Nine.show_steps(23).unwrap();
        assert_eq!(trace.result, 207);
        assert_eq!(digits_of(&trace), vec![(7, 0), (0, 1), (2, 0)]);
        assert_eq!(trace.steps[0].calculation, "10 - 3 = 7");
        assert_eq!(trace.steps[1].calculation, "9 - 2 + 3 = 10");
        assert_eq!(trace.steps[2].calculation, "2 - 1 + 1 = 2");
        assert_eq!(trace.steps[2].position, 2);
    }

    #[test]
    fn test_eight_on_23() {
        let trace = Multiplier::Eight.show_steps(23).unwrap();
        assert_eq!(trace.result, 184);
        assert_eq!(digits_of(&trace), vec![(4, 1), (8, 1), (1, 0)]);
        assert_eq!(trace.steps[0].calculation, "(10 - 3)×2 = 14");
        assert_eq!(trace.steps[1].calculation, "(9 - 2)×2 + 3 + 1 = 18");
        assert_eq!(trace.steps[2].calculation, "2 - 2 + 1 = 1");
    }

    #[test]
    fn test_twelve_final_carry_becomes_leading_digit() {
        let trace = Multiplier::Twelve.show_steps(9).unwrap();
        assert_eq!(trace.result, 108);
        assert_eq!(trace.steps.len(), 2);
        assert_eq!(trace.carry_count(), 2);
    }

    #[test]
    fn test_three_way_leftmost_suppressed_when_zero() {
        let trace = Multiplier::Nine.show_steps(1).unwrap();
        assert_eq!(trace.result, 9);
        let leftmost = trace.steps.last().unwrap();
        assert!(!leftmost.emitted);
        assert_eq!(leftmost.calculation, "1 - 1 = 0");
    }

    #[test]
    fn test_trailing_zero_operands() {
        assert_eq!(Multiplier::Nine.show_steps(100).unwrap().result, 900);
        assert_eq!(Multiplier::Three.show_steps(10).unwrap().result, 30);
        assert_eq!(Multiplier::Eight.show_steps(1000).unwrap().result, 8000);
        assert_eq!(Multiplier::Four.show_steps(50).unwrap().result, 200);
    }

    #[test]
    fn test_zero_operand() {
        for m in Multiplier::ALL {
            assert_eq!(m.show_steps(0).unwrap().result, 0, "{m}");
        }
    }

    #[test]
    fn test_small_operands_match_direct_multiplication() {
        for m in Multiplier::ALL {
            for n in 1..100u64 {
                let trace = m.show_steps(n).unwrap();
                assert_eq!(trace.result, n * u64::from(m.value()), "{m} on {n}");
            }
        }
    }

    #[test]
    fn test_every_step_digit_is_single_digit() {
        for m in Multiplier::ALL {
            for n in [1u64, 49, 987, 55555, 909090, 123456789] {
                for step in m.show_steps(n).unwrap().steps {
                    assert!(step.digit <= 9);
                }
            }
        }
    }

    #[test]
    fn test_operand_out_of_range() {
        let err = Multiplier::Twelve.calculate(MAX_OPERAND + 1).unwrap_err();
        assert!(matches!(err, TrainerError::OperandOutOfRange { .. }));
        assert!(Multiplier::Twelve.show_steps(MAX_OPERAND + 1).is_err());
        assert_eq!(
            Multiplier::Twelve.show_steps(MAX_OPERAND).unwrap().result,
            MAX_OPERAND * 12
        );
    }

    #[test]
    fn test_left_to_right_order() {
        let trace = Multiplier::Eleven.show_steps(78).unwrap();
        let positions: Vec<usize> = trace.left_to_right().map(|s| s.position).collect();
        assert_eq!(positions, vec![2, 1, 0]);
    }

    #[test]
    fn test_worked_solution_matches() {
        let solution = WorkedSolution::new(&Multiplier::Seven, 4821).unwrap();
        assert!(solution.procedure_matches);
        assert_eq!(solution.procedure_result, 33747);
        let rendered = solution.to_string();
        assert!(rendered.starts_with("Trachtenberg Method (×7):"));
        assert!(!rendered.contains("mismatch"));
    }

    #[test]
    fn test_multiplier_serde_as_number() {
        let json = serde_json::to_string(&Multiplier::Eleven).unwrap();
        assert_eq!(json, "11");
        let back: Multiplier = serde_json::from_str("9").unwrap();
        assert_eq!(back, Multiplier::Nine);
        assert!(serde_json::from_str::<Multiplier>("10").is_err());
    }
}
