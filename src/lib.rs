use std::{
    collections::HashMap,
    error,
    fmt::Display,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug)]
pub enum Error {
    NoGoal,
    InvalidButtonText(String),
    InvalidGoalText(String),
    ButtonIndexOutOfRange(usize, usize),
    UnreachableGoal(usize),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NoGoal => write!(
                f,
                "Expect a goal at the end of machine line, but can't find one."
            ),
            Error::InvalidButtonText(s) => write!(f, "Invalid text({}) for button.", s),
            Error::InvalidGoalText(s) => write!(f, "Invalid text({}) for goal.", s),
            Error::ButtonIndexOutOfRange(ind, counter_n) => write!(
                f,
                "Button index({}) is out of range of the goal's {} counter(s).",
                ind, counter_n
            ),
            Error::UnreachableGoal(line_n) => write!(
                f,
                "No combination of button presses reaches the goal of machine on line {}.",
                line_n
            ),
        }
    }
}

impl error::Error for Error {}

#[derive(Debug, Parser)]
pub struct CLIArgs {
    pub input_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Button {
    coeffs: Vec<usize>,
}

impl Button {
    pub fn from_indices(indices: &[usize], counter_n: usize) -> Result<Self, Error> {
        let mut coeffs = vec![0; counter_n];
        for ind in indices {
            if *ind >= counter_n {
                return Err(Error::ButtonIndexOutOfRange(*ind, counter_n));
            }

            coeffs[*ind] = 1;
        }

        Ok(Self { coeffs })
    }
}

#[derive(Debug)]
pub struct Machine {
    buttons: Vec<Button>,
    targets: Vec<usize>,
}

impl TryFrom<&str> for Machine {
    type Error = Error;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        let mut tokens = value.split_ascii_whitespace();
        // The first token is the machine's indicator light diagram, which part 2 ignores.
        tokens.next();
        let tokens = tokens.collect::<Vec<_>>();
        let (goal_text, button_texts) = tokens.split_last().ok_or(Error::NoGoal)?;
        let targets = read_goal(goal_text)?;
        let buttons = button_texts
            .iter()
            .map(|text| {
                read_button(text)
                    .and_then(|indices| Button::from_indices(&indices, targets.len()))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { buttons, targets })
    }
}

impl Machine {
    pub fn new(buttons: Vec<Button>, targets: Vec<usize>) -> Self {
        Self { buttons, targets }
    }

    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    pub fn min_presses(&self) -> Option<usize> {
        let mut solver = PressSolver::new(&self.buttons, self.targets.len());
        solver.min_presses(&self.targets)
    }
}

#[derive(Debug)]
pub struct PressSolver {
    // Subset sum patterns grouped by parity mask, each mapped to its minimum subset size.
    pattern_costs: Vec<HashMap<Vec<usize>, usize>>,
    memo: HashMap<Vec<usize>, Option<usize>>,
}

impl PressSolver {
    pub fn new(buttons: &[Button], counter_n: usize) -> Self {
        let mut pattern_costs = vec![HashMap::new(); 1 << counter_n];
        for subset in 0..(1usize << buttons.len()) {
            let cost = subset.count_ones() as usize;
            let mut pattern = vec![0; counter_n];
            for (ind, button) in buttons.iter().enumerate() {
                if subset & (1 << ind) != 0 {
                    for (sum, coeff) in pattern.iter_mut().zip(button.coeffs.iter()) {
                        *sum += coeff;
                    }
                }
            }

            let class = &mut pattern_costs[parity_mask(&pattern)];
            match class.get_mut(&pattern) {
                Some(min_cost) => *min_cost = cost.min(*min_cost),
                None => {
                    class.insert(pattern, cost);
                }
            }
        }

        Self {
            pattern_costs,
            memo: HashMap::new(),
        }
    }

    pub fn min_presses(&mut self, goal: &[usize]) -> Option<usize> {
        if goal.iter().all(|n| *n == 0) {
            return Some(0);
        }

        if let Some(cost) = self.memo.get(goal) {
            return *cost;
        }

        // Only patterns matching the goal's parity in every counter can leave a
        // remainder that halves exactly.
        let halved_goals = self.pattern_costs[parity_mask(goal)]
            .iter()
            .filter(|(pattern, _)| pattern.iter().zip(goal.iter()).all(|(p, g)| p <= g))
            .map(|(pattern, cost)| {
                (
                    goal.iter()
                        .zip(pattern.iter())
                        .map(|(g, p)| (g - p) / 2)
                        .collect::<Vec<_>>(),
                    *cost,
                )
            })
            .collect::<Vec<_>>();
        let mut min_cost = None;
        for (halved_goal, pattern_cost) in halved_goals {
            if let Some(sub_cost) = self.min_presses(&halved_goal) {
                let cost = pattern_cost + 2 * sub_cost;
                min_cost = Some(min_cost.map_or(cost, |min: usize| min.min(cost)));
            }
        }

        self.memo.insert(goal.to_vec(), min_cost);
        min_cost
    }
}

fn parity_mask(values: &[usize]) -> usize {
    values
        .iter()
        .enumerate()
        .fold(0, |mask, (ind, n)| mask | ((*n % 2) << ind))
}

fn read_button(text: &str) -> Result<Vec<usize>, Error> {
    static BUTTON_PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^\((\d+(?:,\d+)*)?\)$").unwrap());

    if let Some(caps) = BUTTON_PATTERN.captures(text) {
        Ok(caps.get(1).map_or_else(Vec::new, |m| {
            m.as_str()
                .split(',')
                .map(|s| s.parse::<usize>().unwrap())
                .collect()
        }))
    } else {
        Err(Error::InvalidButtonText(text.to_string()))
    }
}

fn read_goal(text: &str) -> Result<Vec<usize>, Error> {
    static GOAL_PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[({](\d+(?:,\d+)*)?[)}]$").unwrap());

    if let Some(caps) = GOAL_PATTERN.captures(text) {
        Ok(caps.get(1).map_or_else(Vec::new, |m| {
            m.as_str()
                .split(',')
                .map(|s| s.parse::<usize>().unwrap())
                .collect()
        }))
    } else {
        Err(Error::InvalidGoalText(text.to_string()))
    }
}

pub fn read_machines<P: AsRef<Path>>(path: P) -> Result<Vec<Machine>> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open given file({}).", path.as_ref().display()))?;
    let reader = BufReader::new(file);
    reader
        .lines()
        .enumerate()
        .filter(|(_, line)| line.as_ref().is_ok_and(|s| !s.is_empty()) || line.is_err())
        .map(|(ind, line)| {
            line.with_context(|| {
                format!(
                    "Failed to read line {} of given file({}).",
                    ind + 1,
                    path.as_ref().display()
                )
            })
            .and_then(|s| {
                Machine::try_from(s.as_str()).with_context(|| {
                    format!("Failed to parse machine from line {}({}).", ind + 1, s)
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_buttons(counter_n: usize) -> Vec<Button> {
        (0..counter_n)
            .map(|ind| Button::from_indices(&[ind], counter_n).unwrap())
            .collect()
    }

    #[test]
    fn empty_subset_gives_zero_pattern_at_no_cost() {
        let solver = PressSolver::new(&unit_buttons(2), 2);
        assert_eq!(solver.pattern_costs[0].get([0, 0].as_slice()), Some(&0));
    }

    #[test]
    fn zero_goal_needs_no_press() {
        let mut solver = PressSolver::new(&unit_buttons(2), 2);
        assert_eq!(solver.min_presses(&[0, 0]), Some(0));
    }

    #[test]
    fn orthogonal_buttons_press_counts_add_up() {
        let mut solver = PressSolver::new(&unit_buttons(2), 2);
        assert_eq!(solver.min_presses(&[3, 2]), Some(5));
    }

    #[test]
    fn solving_the_same_goal_twice_is_deterministic() {
        let mut solver = PressSolver::new(&unit_buttons(3), 3);
        let first = solver.min_presses(&[5, 1, 4]);
        assert_eq!(solver.min_presses(&[5, 1, 4]), first);
    }

    #[test]
    fn cheaper_subset_wins_for_duplicated_pattern() {
        let buttons = vec![
            Button::from_indices(&[0], 2).unwrap(),
            Button::from_indices(&[1], 2).unwrap(),
            Button::from_indices(&[0, 1], 2).unwrap(),
        ];
        let solver = PressSolver::new(&buttons, 2);
        // (1, 1) comes from the third button alone, not from pressing the first two.
        assert_eq!(solver.pattern_costs[3].get([1, 1].as_slice()), Some(&1));
    }

    #[test]
    fn combined_button_shortens_solution() {
        let buttons = vec![
            Button::from_indices(&[0], 2).unwrap(),
            Button::from_indices(&[1], 2).unwrap(),
            Button::from_indices(&[0, 1], 2).unwrap(),
        ];
        let mut solver = PressSolver::new(&buttons, 2);
        assert_eq!(solver.min_presses(&[3, 2]), Some(3));
    }

    #[test]
    fn parity_unmatched_goal_is_unreachable() {
        let buttons = vec![Button::from_indices(&[0], 2).unwrap()];
        let mut solver = PressSolver::new(&buttons, 2);
        assert_eq!(solver.min_presses(&[0, 1]), None);
    }

    #[test]
    fn machine_line_parses_one_hot_buttons() {
        let machine = Machine::try_from("Foo (0) (1) (2,2)").unwrap();
        assert_eq!(machine.min_presses(), Some(4));
    }

    #[test]
    fn brace_delimited_goal_parses() {
        let machine = Machine::try_from("[.#] (0) (1,2) {1,2,3}").unwrap();
        assert_eq!(machine.targets(), &[1, 2, 3]);
    }

    #[test]
    fn missing_goal_fails() {
        assert!(matches!(Machine::try_from("Foo"), Err(Error::NoGoal)));
    }

    #[test]
    fn out_of_range_button_index_fails() {
        assert!(matches!(
            Machine::try_from("Foo (0) (5) (2,2)"),
            Err(Error::ButtonIndexOutOfRange(5, 2))
        ));
    }

    #[test]
    fn malformed_button_token_fails() {
        assert!(matches!(
            Machine::try_from("Foo (0,x) (1) (2,2)"),
            Err(Error::InvalidButtonText(_))
        ));
    }
}
