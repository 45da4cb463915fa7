// Test fixtures
// Small labeled corpus shared by classifier, trainer and engine tests

use crate::models::{Context, TrainingSample};

/// Eight samples per context.
pub fn corpus() -> Vec<TrainingSample> {
    let code = [
        "function add(a, b) { return a + b; }",
        "const total = items.reduce((sum, x) => sum + x, 0);",
        "def parse(line): return line.split(',')",
        "for (let i = 0; i < n; i++) { total += i; }",
        "import os; def main(): return os.getcwd()",
        "class Parser { constructor() { this.pos = 0; } }",
        "if (value === null) { return undefined; }",
        "async function load() { const res = await fetch(url); return res; }",
    ];
    let email = [
        "Dear John, please find the report attached. Best regards, Anna",
        "Dear team, the meeting is moved to Monday. Kind regards, Paul",
        "Hello Maria, thank you for your reply. Best regards, Tom",
        "Dear Sir, please confirm the meeting time. Sincerely, Mark",
        "Hi all, attached is the agenda for the meeting. Regards, Lisa",
        "Dear customer, thank you for your order. Sincerely, Support",
        "Good morning, please review the attached contract. Best regards, Ken",
        "Dear Dr. Lee, thank you for the meeting today. Kind regards, Amy",
    ];
    let chat = [
        "omg that's so cool lol",
        "lol btw are you coming tonight",
        "haha omg no way lol",
        "brb grabbing food lol",
        "idk tbh sounds fun haha",
        "omg yes lol see you there",
        "btw haha that was wild lol",
        "lol ok brb haha",
    ];
    let mut samples = Vec::new();
    for t in code {
        samples.push(TrainingSample::new(t, Context::Code));
    }
    for t in email {
        samples.push(TrainingSample::new(t, Context::Email));
    }
    for t in chat {
        samples.push(TrainingSample::new(t, Context::Chat));
    }
    samples
}
