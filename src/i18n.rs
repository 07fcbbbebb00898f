//! Localized copy.
//!
//! Resources are nested JSON objects per locale and are addressed with dotted
//! key paths (`"battle.correct"`). A missing key falls back to the default
//! locale and then to the key itself, so the UI never renders an empty label.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Ja,
    En,
    Fr,
    Zh,
}

impl Locale {
    pub const ALL: [Locale; 4] = [Locale::Ja, Locale::En, Locale::Fr, Locale::Zh];

    pub fn code(self) -> &'static str {
        match self {
            Locale::Ja => "ja",
            Locale::En => "en",
            Locale::Fr => "fr",
            Locale::Zh => "zh",
        }
    }

    pub fn parse(code: &str) -> Option<Locale> {
        Locale::ALL.iter().copied().find(|l| l.code() == code.trim())
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Translation resources plus the fallback policy.
#[derive(Clone, Debug)]
pub struct Catalog {
    default_locale: Locale,
    resources: HashMap<Locale, Value>,
}

impl Catalog {
    pub fn new(default_locale: Locale) -> Self {
        Self { default_locale, resources: HashMap::new() }
    }

    /// Catalog with the copy that ships with the game.
    pub fn builtin() -> Self {
        let mut catalog = Catalog::new(Locale::Ja);
        catalog.insert(Locale::Ja, ja());
        catalog.insert(Locale::En, en());
        catalog.insert(Locale::Fr, fr());
        catalog.insert(Locale::Zh, zh());
        catalog
    }

    pub fn insert(&mut self, locale: Locale, resource: Value) {
        self.resources.insert(locale, resource);
    }

    pub fn default_locale(&self) -> Locale {
        self.default_locale
    }

    pub fn has_locale(&self, locale: Locale) -> bool {
        self.resources.contains_key(&locale)
    }

    fn walk<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
        key.split('.').try_fold(root, |node, segment| node.get(segment))
    }

    /// Raw value for `key`, with default-locale fallback.
    pub fn lookup(&self, locale: Locale, key: &str) -> Option<&Value> {
        self.resources
            .get(&locale)
            .and_then(|r| Self::walk(r, key))
            .or_else(|| self.resources.get(&self.default_locale).and_then(|r| Self::walk(r, key)))
    }

    /// Plain string for `key`; the key itself when nothing is found. A
    /// non-string value counts as missing.
    pub fn text(&self, locale: Locale, key: &str) -> String {
        [locale, self.default_locale]
            .iter()
            .filter_map(|l| self.resources.get(l).and_then(|r| Self::walk(r, key)))
            .find_map(Value::as_str)
            .unwrap_or(key)
            .to_string()
    }

    /// Template lookup with `{name}` placeholder substitution.
    pub fn format(&self, locale: Locale, key: &str, args: &[(&str, String)]) -> String {
        fill(&self.text(locale, key), args)
    }

    /// Pluralized "N combos" phrase for the orb puzzle.
    pub fn combo_message(&self, locale: Locale, count: usize) -> String {
        let key = if count == 1 { "puzzle.comboOne" } else { "puzzle.comboMany" };
        self.format(locale, key, &[("count", count.to_string())])
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Replace every `{name}` in `template` with its value.
pub fn fill(template: &str, args: &[(&str, String)]) -> String {
    args.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}

fn ja() -> Value {
    json!({
        "monsters": { "denkiryu": "デンキリュウ", "mizugame": "ミズガメ", "happamon": "ハッパモン", "honoodon": "ホノオドン", "starion": "スタリオン", "crystalos": "クリスタロス", "raidenking": "ライデンキング", "mathemperor": "マスエンペラー" },
        "math": {
            "whichBigger": "どちらが大きい？",
            "comparisonHint": "十のくらいから くらべよう。",
            "additionCarryHint": "一のくらいが10をこえたら くり上げよう。",
            "subtractionBorrowHint": "一のくらいが ひけないときは くり下げよう。",
            "clockPrompt": "時計合わせ",
            "clockHint": "みじかい針と ながい針を よく見よう。",
            "coinPrompt": "{expression} = ?",
            "currencySymbol": "¥",
            "coinHint": "コインを ひとつずつ たそう。",
            "parity": { "even": "偶数", "odd": "奇数", "both": "どちらも", "neither": "どちらでもない" },
            "evenOddPrompt": "{number}は偶数？奇数？",
            "evenOddHint": "一のくらいを見よう。",
            "arrayHint": "たてと よこの ならびで 考えよう。",
            "divisionHint": "わり算は かけ算の ぎゃくだよ。",
            "wordProblemPrompt": "{total}個のおかしを{children}人で同じ数ずつ分けます。1人あたりはいくつ？",
            "wordProblemHint": "お話から しきを つくろう。",
            "unitConversionPrompt": "たんいを かえよう：",
            "unitConversionHint": "かける数を おもいだそう。",
            "dataReadingPrompt": "いちばん大きいのは どれ？",
            "dataReadingHint": "数を ていねいに くらべよう。",
            "dataLabels": { "a": "A", "b": "B", "c": "C" }
        },
        "battle": {
            "correct": "せいかい！すごいね！",
            "incorrect": "ざんねん！もういちど！",
            "timeUp": "じかんぎれ！もういちど！",
            "wall": "かべだよ！べつの道をさがそう！",
            "gateBlocked": "ボスをたおさないと とおれない！",
            "gateOpened": "ゲートがひらいた！",
            "monsterDefeated": "{name}をたおした！",
            "bossDefeated": "ボス {name}をたおした！ゲートがひらくよ！",
            "levelClear": "おめでとう！レベル{level}クリア！"
        },
        "puzzle": {
            "ready": "珠をスライドしてならべかえよう。",
            "invalidSwap": "コンボができなかったので、もとにもどしたよ。",
            "outOfTurns": "ターンがおわったよ。リセットして続けよう！",
            "comboOne": "{count}コンボ！よくできました！",
            "comboMany": "{count}コンボ！よくできました！"
        },
        "kokugo": {
            "noQuestions": "えらんだ じょうけんの もんだいが ないよ。"
        }
    })
}

fn en() -> Value {
    json!({
        "monsters": { "denkiryu": "Electrox", "mizugame": "Aquaturtle", "happamon": "Leafmon", "honoodon": "Blazedon", "starion": "Starion", "crystalos": "Crystalos", "raidenking": "Thunder King", "mathemperor": "Math Emperor" },
        "math": {
            "whichBigger": "Which is bigger?",
            "comparisonHint": "Compare the tens digit first.",
            "additionCarryHint": "When the ones add up past 10, carry one ten.",
            "subtractionBorrowHint": "If the ones cannot be subtracted, borrow a ten.",
            "clockPrompt": "Match the clock",
            "clockHint": "Look at the hour and minute hands.",
            "coinPrompt": "{expression} = ?",
            "currencySymbol": "¥",
            "coinHint": "Add each coin value.",
            "parity": { "even": "Even", "odd": "Odd", "both": "Both", "neither": "Neither" },
            "evenOddPrompt": "{number} is even or odd?",
            "evenOddHint": "Check the ones digit.",
            "arrayHint": "Use rows and columns.",
            "divisionHint": "Division undoes multiplication.",
            "wordProblemPrompt": "Share {total} snacks equally among {children} kids. How many per kid?",
            "wordProblemHint": "Build the equation from the story.",
            "unitConversionPrompt": "Convert the unit:",
            "unitConversionHint": "Multiply by the conversion factor.",
            "dataReadingPrompt": "Which is the greatest value?",
            "dataReadingHint": "Compare the numbers carefully.",
            "dataLabels": { "a": "A", "b": "B", "c": "C" }
        },
        "battle": {
            "correct": "Correct! Great job!",
            "incorrect": "Try again!",
            "timeUp": "Time's up! Try again!",
            "wall": "It's a wall! Find another way!",
            "gateBlocked": "Defeat the boss to pass!",
            "gateOpened": "Gate opened!",
            "monsterDefeated": "{name} defeated!",
            "bossDefeated": "Boss {name} defeated! Gate will open!",
            "levelClear": "Congratulations! Level {level} cleared!"
        },
        "puzzle": {
            "ready": "Slide orbs to rearrange them.",
            "invalidSwap": "No combo was formed, so the board was restored.",
            "outOfTurns": "You are out of turns. Reset to keep playing!",
            "comboOne": "Nice combo!",
            "comboMany": "{count} combos!"
        },
        "kokugo": {
            "noQuestions": "No questions match the selected filters."
        }
    })
}

fn fr() -> Value {
    json!({
        "monsters": { "denkiryu": "Électryx", "mizugame": "Aquatortue", "happamon": "Feuilmon", "honoodon": "Flammedon", "starion": "Étoilon", "crystalos": "Crystalos", "raidenking": "Roi Tonnerre", "mathemperor": "Empereur Math" },
        "math": {
            "whichBigger": "Lequel est plus grand?",
            "clockPrompt": "Remets l'horloge",
            "parity": { "even": "Pair", "odd": "Impair", "both": "Les deux", "neither": "Aucun" },
            "evenOddPrompt": "{number} est pair ou impair ?",
            "wordProblemPrompt": "On partage {total} friandises entre {children} enfants. Combien chacun ?"
        },
        "battle": {
            "correct": "Correct! Bravo!",
            "incorrect": "Essaie encore!",
            "timeUp": "Temps écoulé!",
            "wall": "C'est un mur!",
            "gateBlocked": "Vaincs le boss pour passer!",
            "gateOpened": "Porte ouverte!",
            "monsterDefeated": "{name} vaincu!",
            "bossDefeated": "Boss {name} vaincu!"
        },
        "puzzle": {
            "comboOne": "Super combo !",
            "comboMany": "{count} combos !"
        }
    })
}

fn zh() -> Value {
    json!({
        "monsters": { "denkiryu": "电龙", "mizugame": "水龟", "happamon": "叶兽", "honoodon": "火焰兽", "starion": "星兽", "crystalos": "水晶兽" },
        "math": {
            "whichBigger": "哪个更大？",
            "clockPrompt": "调准时钟",
            "parity": { "even": "偶数", "odd": "奇数", "both": "都可以", "neither": "都不是" },
            "evenOddPrompt": "{number} 是偶数还是奇数？",
            "wordProblemPrompt": "{total}个点心平均分给{children}个孩子。每人得到多少？"
        },
        "battle": {
            "correct": "正确！太棒了！",
            "incorrect": "再试一次！",
            "timeUp": "时间到！",
            "wall": "是墙！",
            "gateBlocked": "击败boss才能通过！",
            "gateOpened": "大门打开了！",
            "monsterDefeated": "{name}被击败！",
            "bossDefeated": "Boss {name}被击败！"
        },
        "puzzle": {
            "comboOne": "{count}连击！",
            "comboMany": "{count}连击！"
        }
    })
}
