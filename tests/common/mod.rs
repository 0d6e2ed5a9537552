//! Shared test input: a pure, restartable generator of compound words.
//!
//! `words(1)` yields the base 50-word list; each extra level of depth takes
//! the cross product with the base list again (`words(2)` is 2500 distinct
//! hyphenated pairs). No shared state; every call rebuilds the same sequence.

const D0: [&str; 50] = [
    "spiffy", "amusing", "weigh", "milk", "groan", "utter", "low", "abusive",
    "fill", "spark", "important", "joke", "snail", "crib", "chalk", "group",
    "pull", "impress", "capable", "design", "fry", "authority", "exclusive",
    "nutritious", "robin", "book", "upbeat", "smoke", "oval", "sparkling",
    "available", "domineering", "treatment", "friends", "alert", "occur",
    "level", "old-fashioned", "unadvised", "crabby", "languid", "radiate",
    "wine", "pest", "behavior", "drown", "eggs", "tasteless", "check", "peace",
];

pub fn words(depth: usize) -> Vec<String> {
    let mut out: Vec<String> = D0.iter().map(|w| (*w).to_string()).collect();
    for _ in 1..depth {
        out = out
            .iter()
            .flat_map(|x| D0.iter().map(move |y| format!("{x}-{y}")))
            .collect();
    }
    out
}
