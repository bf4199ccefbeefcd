use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::mood::{EmotionKind, MoodState, NotificationMessages};

use super::{ResponseGenerator, ResponseRequest};

const DOWN_ALERT_AFTER: u32 = 5;
const UP_ALERT_AFTER: u32 = 10;

const REPLIES_DOWN: &[&str] = &[
    "It looks like you're not feeling great right now. Do you want to tell me what's on your mind?",
    "You seem a bit low. Feel free to share what's weighing on you, I'm listening.",
    "Something seems to be bothering you. Talking it through can help. I'm here.",
    "Hard moments are part of life, and you're not alone in this one. What's going on?",
    "You look stressed or sad. Taking a short break to talk about it can really help.",
    "Your mood seems a little heavy today. Want to talk about it together?",
    "This looks like a tough stretch for you. It's okay to open up, it often helps.",
    "I think you could use some support. What's making you sad or anxious right now?",
];

const REPLIES_UP: &[&str] = &[
    "You look like you're in great shape today! What's making you happy?",
    "What a lovely burst of positive energy. Keep it going!",
    "Your mood looks sunny. Enjoy this moment!",
    "You seem really pleased about something. Care to share the good news?",
    "It's a pleasure to see you in such good spirits. What put you in this mood?",
    "You're radiating today. Thanks for sharing the good vibes!",
    "Looks like life is smiling at you right now. Make the most of it!",
];

const REPLIES_NEUTRAL: &[&str] = &[
    "You look calm and steady today. How can I help?",
    "You seem in a fairly neutral mood. How is your day going?",
    "I'm here if you feel like chatting. How are you really feeling?",
    "Things look stable on your side. Anything you'd like to talk about?",
    "You seem balanced today. Want to go over something in particular?",
    "You look relaxed. Want to chat, or just take it easy?",
];

const FOLLOWUP_DOWN: &[&str] = &[
    "Take your time, there's no rush. Say it however it comes.",
    "Breathe in deeply. Putting words on feelings often helps.",
    "You can tell me anything, no judgement.",
    "Even hard days come to an end. You're stronger than you think.",
    "Asking for help or talking about it is a sign of strength, not weakness.",
];

const FOLLOWUP_UP: &[&str] = &[
    "Keep nurturing that positive energy!",
    "Moments like this deserve to be savoured.",
    "Your joy is contagious, thanks for sharing it!",
    "Hold on to this memory for the harder days.",
    "You deserve all of this. Enjoy it!",
];

const FOLLOWUP_NEUTRAL: &str = "Don't hesitate to talk to me if anything changes.";

fn tips_for(emotion: EmotionKind) -> &'static [&'static str] {
    match emotion {
        EmotionKind::Sad => &[
            "Tip: soft music or a small creative activity can help with sadness.",
            "Tip: a 10 to 15 minute walk outside can really lift your mood.",
            "Tip: reach out to a friend or someone close, support matters in these moments.",
        ],
        EmotionKind::Angry => &[
            "Tip: try box breathing. In for 4 seconds, hold for 4, out for 6.",
            "Tip: physical exercise is a healthy way to let anger out.",
            "Tip: write down what makes you angry, then crumple the page and throw it away.",
        ],
        EmotionKind::Fear => &[
            "Tip: name exactly what scares you. It often makes it feel smaller.",
            "Tip: share your worries with someone you trust, it takes the edge off.",
            "Tip: a few minutes of mindfulness meditation can calm anxiety.",
        ],
        EmotionKind::Happy => &[
            "Idea: write this happy moment down in a gratitude journal!",
            "Idea: share your joy with the people close to you.",
            "Idea: take a mental snapshot of this moment to revisit later.",
        ],
        EmotionKind::Surprise => &["Good surprises are great for morale. Ride that energy!"],
        EmotionKind::Disgust => &[
            "Tip: identify what bothers you and, if you can, step away from it.",
        ],
        EmotionKind::Neutral => &[
            "A neutral state is healthy. A good moment to plan or refocus.",
        ],
    }
}

/// Canned replies picked uniformly at random from per-mood tables.
pub struct StaticResponses {
    rng: Mutex<StdRng>,
}

impl Default for StaticResponses {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticResponses {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic selection, for tests and reproducible demos.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn reply(&self, mood: MoodState, emotion: Option<EmotionKind>, include_tip: bool) -> String {
        let table = match mood {
            MoodState::Down => REPLIES_DOWN,
            MoodState::Up => REPLIES_UP,
            MoodState::Neutral => REPLIES_NEUTRAL,
        };
        let mut response = self.pick(table).to_string();

        if include_tip {
            if let Some(emotion) = emotion {
                let tip = self.pick(tips_for(emotion));
                response.push_str("\n\n");
                response.push_str(tip);
            }
        }

        response
    }

    pub fn followup(&self, mood: MoodState) -> String {
        match mood {
            MoodState::Down => self.pick(FOLLOWUP_DOWN).to_string(),
            MoodState::Up => self.pick(FOLLOWUP_UP).to_string(),
            MoodState::Neutral => FOLLOWUP_NEUTRAL.to_string(),
        }
    }

    fn pick(&self, options: &[&'static str]) -> &'static str {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        options.choose(&mut *rng).copied().unwrap_or_default()
    }
}

impl NotificationMessages for StaticResponses {
    fn notification_message(&self, mood: MoodState, magnitude: u32) -> Option<String> {
        // The figure is labelled minutes; by default it is a sample count.
        match mood {
            MoodState::Down if magnitude > DOWN_ALERT_AFTER => Some(format!(
                "You seem to have been feeling low for {magnitude} minutes. \
                 Consider taking a break, getting some fresh air, or talking to someone you trust."
            )),
            MoodState::Up if magnitude > UP_ALERT_AFTER => Some(format!(
                "You've been in a great mood for {magnitude} minutes! Keep enjoying it!"
            )),
            _ => None,
        }
    }
}

#[async_trait]
impl ResponseGenerator for StaticResponses {
    async fn generate(&self, request: &ResponseRequest) -> Result<String> {
        Ok(self.reply(request.mood, request.emotion, request.include_tip))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
