//! Chatbot message handling.
//!
//! One call per incoming message:
//! 1. Fetch the current dormitory list
//! 2. Classify the message with the [`IntentRouter`]
//! 3. Answer price questions from the listings, distance questions through
//!    the [`DistanceResolver`], and everything else through the LLM

pub mod repository;

use regex::Regex;
use std::fmt::Write as _;
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::agent::pricing::{answer_cheapest_dorm_query, format_baht, format_ranking, CheapestAnswer};
use crate::agent::router::{Intent, IntentRouter};
use crate::config::ChatbotConfig;
use crate::distance::{DistanceError, DistanceResolver, DistanceResult, TravelMode};
use crate::models::{positive, Dormitory, GeoPoint};
use crate::provider::{ChatMessage, LlmProvider};
use repository::DormRepository;

const NO_PRICE_DATA: &str = "ขออภัย ตอนนี้ยังไม่มีข้อมูลราคาหอพักในระบบ";

const APPROXIMATE_NOTE: &str =
    "* ระยะทางเป็นค่าประมาณแบบเส้นตรง เนื่องจากเชื่อมต่อบริการแผนที่ไม่ได้";

const ASK_FOR_PLACE: &str = "ต้องการทราบระยะทางจากที่ไหนครับ? ระบุชื่อหอพัก 2 แห่ง \
     ชื่อสถานที่ หรือพิกัด (ละติจูด, ลองจิจูด) ได้เลย";

const HELP_TEXT: &str = "สวัสดีครับ ผมช่วยตอบคำถามเรื่องหอพักได้ เช่น \
     \"หอไหนถูกที่สุด\" หรือ \"หอ A ไปมหาวิทยาลัยไกลไหม\"";

/// The chatbot's answer to one message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub intent: Intent,
    pub text: String,
    /// True when any distance in the text is a straight-line estimate.
    pub approximate: bool,
}

impl ChatReply {
    fn exact(intent: Intent, text: impl Into<String>) -> Self {
        Self {
            intent,
            text: text.into(),
            approximate: false,
        }
    }
}

/// A place the user asked about: a configured landmark or raw coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub point: GeoPoint,
}

pub struct Chatbot {
    dorms: Box<dyn DormRepository>,
    resolver: DistanceResolver,
    llm: Option<Box<dyn LlmProvider>>,
    config: ChatbotConfig,
}

impl Chatbot {
    pub fn new(
        dorms: Box<dyn DormRepository>,
        resolver: DistanceResolver,
        llm: Option<Box<dyn LlmProvider>>,
        config: ChatbotConfig,
    ) -> Self {
        Self {
            dorms,
            resolver,
            llm,
            config,
        }
    }

    /// Answer a single message.
    pub async fn respond(&self, message: &str) -> anyhow::Result<ChatReply> {
        let dorms = self.dorms.list().await?;
        let intent = IntentRouter::classify(message);

        let reply = match intent {
            Intent::CheapestPrice => self.answer_price(message, &dorms),
            Intent::DistanceQuery => self.answer_distance(message, &dorms).await,
            Intent::Other => self.answer_general(message, &dorms).await,
        };

        info!(
            intent = intent.as_str(),
            approximate = reply.approximate,
            reply_len = reply.text.len(),
            "Chatbot reply ready"
        );
        Ok(reply)
    }

    fn answer_price(&self, message: &str, dorms: &[Dormitory]) -> ChatReply {
        let text = match answer_cheapest_dorm_query(message, dorms) {
            CheapestAnswer::Matched(top) => format_ranking(&top),
            CheapestAnswer::MatchedNoData | CheapestAnswer::NotMatched => NO_PRICE_DATA.to_string(),
        };
        ChatReply::exact(Intent::CheapestPrice, text)
    }

    async fn answer_distance(&self, message: &str, dorms: &[Dormitory]) -> ChatReply {
        let named = IntentRouter::extract_dorms(message, dorms);
        let place = self.find_place(message);

        match (named.as_slice(), place) {
            ([first, second, ..], _) => self.compare_dorms(first, second).await,
            ([dorm], Some(place)) => self.dorm_to_place(dorm, &place).await,
            ([dorm], None) => match self.default_place() {
                Some(place) => self.dorm_to_place(dorm, &place).await,
                None => ChatReply::exact(Intent::DistanceQuery, ASK_FOR_PLACE),
            },
            ([], Some(place)) => self.nearest_to(&place, dorms).await,
            ([], None) => ChatReply::exact(Intent::DistanceQuery, ASK_FOR_PLACE),
        }
    }

    async fn compare_dorms(&self, first: &Dormitory, second: &Dormitory) -> ChatReply {
        match self
            .resolver
            .calculate_distance_between_dorms(first, second)
            .await
        {
            Ok(cmp) => {
                let mut text = format!("ระยะทางจาก {} ถึง {}:", cmp.dorm1_name, cmp.dorm2_name);
                push_mode_line(&mut text, &cmp.walking);
                push_mode_line(&mut text, &cmp.driving);
                with_note(text, cmp.walking.is_fallback || cmp.driving.is_fallback)
            }
            Err(DistanceError::MissingCoordinates { dorm }) => {
                warn!(dorm = %dorm, "Cannot compare dormitories without coordinates");
                ChatReply::exact(
                    Intent::DistanceQuery,
                    format!("ขออภัย หอ {} ยังไม่มีข้อมูลพิกัด จึงคำนวณระยะทางไม่ได้", dorm),
                )
            }
        }
    }

    async fn dorm_to_place(&self, dorm: &Dormitory, place: &Place) -> ChatReply {
        let Some(from) = dorm.location() else {
            return ChatReply::exact(
                Intent::DistanceQuery,
                format!("ขออภัย หอ {} ยังไม่มีข้อมูลพิกัด จึงคำนวณระยะทางไม่ได้", dorm.name),
            );
        };

        let (walking, driving) = futures::join!(
            self.resolver.route_between(from, place.point, TravelMode::FootWalking),
            self.resolver.route_between(from, place.point, TravelMode::DrivingCar),
        );

        let mut text = format!("ระยะทางจาก {} ถึง {}:", dorm.name, place.name);
        push_mode_line(&mut text, &walking);
        push_mode_line(&mut text, &driving);
        with_note(text, walking.is_fallback || driving.is_fallback)
    }

    async fn nearest_to(&self, place: &Place, dorms: &[Dormitory]) -> ChatReply {
        let nearest = self
            .resolver
            .find_nearest_dorms_to_location(
                place.point.lat,
                place.point.lon,
                dorms,
                self.config.nearest_limit,
            )
            .await;

        if nearest.is_empty() {
            return ChatReply::exact(
                Intent::DistanceQuery,
                "ขออภัย ยังไม่มีหอพักที่มีข้อมูลพิกัดในระบบ",
            );
        }

        let mut text = format!("หอพักที่ใกล้ {} ที่สุด:", place.name);
        for (i, n) in nearest.iter().enumerate() {
            let _ = write!(
                text,
                "\n{}. {} - {} กม. ({} {})",
                i + 1,
                n.dorm.name,
                n.distance.distance_km,
                n.distance.mode_label,
                n.distance.duration_text
            );
        }
        let approximate = nearest.iter().any(|n| n.distance.is_fallback);
        with_note(text, approximate)
    }

    async fn answer_general(&self, message: &str, dorms: &[Dormitory]) -> ChatReply {
        let Some(llm) = self.llm.as_ref() else {
            return ChatReply::exact(Intent::Other, HELP_TEXT);
        };

        let messages = [
            ChatMessage::system(&system_prompt(dorms)),
            ChatMessage::user(message),
        ];

        match llm.chat(&messages).await {
            Ok(text) => ChatReply::exact(Intent::Other, text),
            Err(e) => {
                warn!(model = llm.default_model(), error = %e, "LLM call failed, using help text");
                ChatReply::exact(Intent::Other, HELP_TEXT)
            }
        }
    }

    /// Explicit `lat, lon` in the message wins over landmark names.
    pub fn find_place(&self, message: &str) -> Option<Place> {
        if let Some(point) = parse_coordinates(message) {
            return Some(Place {
                name: format!("พิกัด {:.5}, {:.5}", point.lat, point.lon),
                point,
            });
        }

        let lower = message.to_lowercase();
        self.config
            .landmarks
            .iter()
            .filter(|l| lower.contains(&l.name.to_lowercase()))
            .find_map(|l| {
                l.point().map(|point| Place {
                    name: l.name.clone(),
                    point,
                })
            })
    }

    fn default_place(&self) -> Option<Place> {
        let name = self.config.default_landmark.as_deref()?;
        let landmark = self.config.landmark(name)?;
        Some(Place {
            name: landmark.name.clone(),
            point: landmark.point()?,
        })
    }
}

fn push_mode_line(text: &mut String, result: &DistanceResult) {
    let _ = write!(
        text,
        "\n- {}: {} กม. (ประมาณ {})",
        result.mode_label, result.distance_km, result.duration_text
    );
}

fn with_note(mut text: String, approximate: bool) -> ChatReply {
    if approximate {
        text.push_str("\n\n");
        text.push_str(APPROXIMATE_NOTE);
    }
    ChatReply {
        intent: Intent::DistanceQuery,
        text,
        approximate,
    }
}

fn coordinate_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(-?\d{1,2}\.\d+)\s*,\s*(-?\d{1,3}\.\d+)").expect("valid coordinate regex")
    })
}

/// First `lat, lon` decimal pair in the text, if it is a valid point.
pub fn parse_coordinates(text: &str) -> Option<GeoPoint> {
    let caps = coordinate_pattern().captures(text)?;
    let lat = caps[1].parse::<f64>().ok()?;
    let lon = caps[2].parse::<f64>().ok()?;
    GeoPoint::new(lat, lon)
}

/// Grounding context for the LLM: the current listings, one per line.
fn system_prompt(dorms: &[Dormitory]) -> String {
    let mut prompt = String::from(
        "คุณคือผู้ช่วยตอบคำถามเกี่ยวกับหอพัก ตอบเป็นภาษาไทยอย่างสั้นและสุภาพ \
         ใช้เฉพาะข้อมูลหอพักด้านล่าง ถ้าไม่มีข้อมูลให้บอกว่าไม่ทราบ\n\nรายชื่อหอพัก:",
    );

    for dorm in dorms {
        let _ = write!(prompt, "\n- {}", dorm.name);
        for (label, price) in [
            ("รายวัน", dorm.price_daily),
            ("รายเดือน", dorm.price_monthly),
            ("รายเทอม", dorm.price_term),
        ] {
            if let Some(value) = positive(price) {
                let _ = write!(prompt, " | {} {} บาท", label, format_baht(value));
            }
        }
        if let Some(facilities) = dorm.facilities.as_deref().filter(|f| !f.trim().is_empty()) {
            let _ = write!(prompt, " | สิ่งอำนวยความสะดวก: {}", facilities.trim());
        }
        if let Some(address) = dorm.address.as_deref().filter(|a| !a.trim().is_empty()) {
            let _ = write!(prompt, " | ที่อยู่: {}", address.trim());
        }
        let nearby: Vec<&str> = dorm
            .nearby_places()
            .filter_map(|p| p.label.as_deref())
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if !nearby.is_empty() {
            let _ = write!(prompt, " | สถานที่ใกล้เคียง: {}", nearby.join(", "));
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Landmark;
    use crate::distance::{RouteLeg, RouteProvider, RoutingError};
    use crate::models::CoordinateEntry;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct StaticDorms(Vec<Dormitory>);

    #[async_trait]
    impl DormRepository for StaticDorms {
        async fn list(&self) -> anyhow::Result<Vec<Dormitory>> {
            Ok(self.0.clone())
        }
    }

    struct DownProvider;

    #[async_trait]
    impl RouteProvider for DownProvider {
        async fn route(&self, _: GeoPoint, _: GeoPoint, _: TravelMode) -> Result<RouteLeg, RoutingError> {
            Err(RoutingError::NotConfigured)
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    struct FlatProvider;

    #[async_trait]
    impl RouteProvider for FlatProvider {
        async fn route(&self, _: GeoPoint, _: GeoPoint, _: TravelMode) -> Result<RouteLeg, RoutingError> {
            Ok(RouteLeg {
                distance_m: 2500.0,
                duration_s: 1800.0,
            })
        }

        fn name(&self) -> &str {
            "flat"
        }
    }

    /// Records the prompts it receives and answers with a fixed string.
    struct EchoLlm {
        seen: Arc<Mutex<Vec<ChatMessage>>>,
        fail: bool,
    }

    #[async_trait]
    impl LlmProvider for EchoLlm {
        async fn chat(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
            self.seen.lock().unwrap().extend_from_slice(messages);
            if self.fail {
                anyhow::bail!("rate limited");
            }
            Ok("มีเครื่องซักผ้าครับ".into())
        }

        fn default_model(&self) -> &str {
            "echo"
        }
    }

    fn dorm(name: &str, monthly: Option<f64>, at: Option<(f64, f64)>) -> Dormitory {
        let mut d = Dormitory {
            price_monthly: monthly,
            ..Dormitory::new(name)
        };
        if let Some((lat, lon)) = at {
            d.coordinates.push(CoordinateEntry::new(lat, lon));
        }
        d
    }

    fn listings() -> Vec<Dormitory> {
        vec![
            dorm("หอพักสุขใจ", Some(3000.0), Some((13.75, 100.50))),
            dorm("บ้านสวน", Some(2200.0), Some((13.76, 100.51))),
            dorm("ไร้พิกัด", Some(1800.0), None),
        ]
    }

    fn config() -> ChatbotConfig {
        ChatbotConfig {
            landmarks: vec![Landmark {
                name: "มหาวิทยาลัย".into(),
                latitude: 13.7563,
                longitude: 100.5018,
            }],
            ..ChatbotConfig::default()
        }
    }

    fn bot(provider: Box<dyn RouteProvider>, llm: Option<Box<dyn LlmProvider>>) -> Chatbot {
        Chatbot::new(
            Box::new(StaticDorms(listings())),
            DistanceResolver::new(provider),
            llm,
            config(),
        )
    }

    #[tokio::test]
    async fn test_price_question() {
        let reply = bot(Box::new(FlatProvider), None)
            .respond("หอไหนถูกที่สุด")
            .await
            .unwrap();
        assert_eq!(reply.intent, Intent::CheapestPrice);
        assert!(reply.text.find("ไร้พิกัด").unwrap() < reply.text.find("บ้านสวน").unwrap());
    }

    #[tokio::test]
    async fn test_price_question_without_prices() {
        let bot = Chatbot::new(
            Box::new(StaticDorms(vec![Dormitory::new("ว่าง")])),
            DistanceResolver::new(Box::new(FlatProvider)),
            None,
            config(),
        );
        let reply = bot.respond("หอราคาถูก").await.unwrap();
        assert_eq!(reply.intent, Intent::CheapestPrice);
        assert_eq!(reply.text, NO_PRICE_DATA);
    }

    #[tokio::test]
    async fn test_two_dorms_compared() {
        let reply = bot(Box::new(FlatProvider), None)
            .respond("หอสุขใจ ไป บ้านสวน ไกลไหม")
            .await
            .unwrap();
        assert_eq!(reply.intent, Intent::DistanceQuery);
        assert!(reply.text.starts_with("ระยะทางจาก หอพักสุขใจ ถึง บ้านสวน"));
        assert!(reply.text.contains("เดิน: 2.50 กม. (ประมาณ 30 นาที)"));
        assert!(!reply.approximate);
    }

    #[tokio::test]
    async fn test_compare_with_missing_coordinates() {
        let reply = bot(Box::new(FlatProvider), None)
            .respond("ไร้พิกัด กับ บ้านสวน ห่างกันกี่กิโล")
            .await
            .unwrap();
        assert!(reply.text.contains("ไร้พิกัด ยังไม่มีข้อมูลพิกัด"));
    }

    #[tokio::test]
    async fn test_dorm_to_landmark_falls_back() {
        let reply = bot(Box::new(DownProvider), None)
            .respond("บ้านสวนไปมหาวิทยาลัยไกลไหม")
            .await
            .unwrap();
        assert!(reply.approximate);
        assert!(reply.text.contains("ถึง มหาวิทยาลัย"));
        assert!(reply.text.ends_with(APPROXIMATE_NOTE));
    }

    #[tokio::test]
    async fn test_nearest_to_landmark() {
        let reply = bot(Box::new(FlatProvider), None)
            .respond("หอใกล้มหาวิทยาลัยมีที่ไหนบ้าง")
            .await
            .unwrap();
        assert!(reply.text.starts_with("หอพักที่ใกล้ มหาวิทยาลัย ที่สุด:"));
        assert!(!reply.text.contains("ไร้พิกัด"));
        assert!(reply.text.contains("2. "));
    }

    #[tokio::test]
    async fn test_distance_without_place_asks() {
        let reply = bot(Box::new(FlatProvider), None)
            .respond("ระยะทางเท่าไหร่")
            .await
            .unwrap();
        assert_eq!(reply.text, ASK_FOR_PLACE);
    }

    #[tokio::test]
    async fn test_general_uses_llm_with_listing_context() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let llm = EchoLlm {
            seen: Arc::clone(&seen),
            fail: false,
        };
        let reply = bot(Box::new(FlatProvider), Some(Box::new(llm)))
            .respond("หอสุขใจมีเครื่องซักผ้าไหม")
            .await
            .unwrap();

        assert_eq!(reply.intent, Intent::Other);
        assert_eq!(reply.text, "มีเครื่องซักผ้าครับ");
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].role, "system");
        assert!(seen[0].content.contains("บ้านสวน | รายเดือน 2,200 บาท"));
        assert_eq!(seen[1].content, "หอสุขใจมีเครื่องซักผ้าไหม");
    }

    #[tokio::test]
    async fn test_general_llm_failure_uses_help() {
        let llm = EchoLlm {
            seen: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        };
        let reply = bot(Box::new(FlatProvider), Some(Box::new(llm)))
            .respond("สวัสดี")
            .await
            .unwrap();
        assert_eq!(reply.text, HELP_TEXT);
    }

    #[test]
    fn test_parse_coordinates() {
        let p = parse_coordinates("หอใกล้ 13.7563, 100.5018 ที่สุด").unwrap();
        assert_eq!(p.lat, 13.7563);
        assert_eq!(p.lon, 100.5018);
        assert!(parse_coordinates("ราคา 3,500 บาท").is_none());
        assert!(parse_coordinates("95.0, 100.0").is_none());
    }

    #[test]
    fn test_coordinates_beat_landmarks() {
        let bot = bot(Box::new(FlatProvider), None);
        let place = bot.find_place("มหาวิทยาลัย 13.8, 100.6").unwrap();
        assert_eq!(place.point, GeoPoint::new(13.8, 100.6).unwrap());
        assert_eq!(bot.find_place("มหาวิทยาลัย").unwrap().name, "มหาวิทยาลัย");
        assert!(bot.find_place("ตลาด").is_none());
    }

    #[test]
    fn test_system_prompt_lists_nearby_places() {
        let mut listing = dorm("หอพักสุขใจ", Some(3000.0), Some((13.75, 100.50)));
        listing.coordinates.push(CoordinateEntry {
            label: Some("ตลาดนัด".into()),
            ..CoordinateEntry::new(13.751, 100.501)
        });
        listing.coordinates.push(CoordinateEntry {
            label: Some(" 7-Eleven ".into()),
            ..CoordinateEntry::new(13.752, 100.502)
        });
        listing.coordinates.push(CoordinateEntry::new(13.753, 100.503));

        let prompt = system_prompt(&[listing]);
        assert!(prompt.contains("หอพักสุขใจ | รายเดือน 3,000 บาท | สถานที่ใกล้เคียง: ตลาดนัด, 7-Eleven"));
    }
}
