//! 検証済みトークンから取り出した Claims。

use serde::{Deserialize, Serialize};

/// Claims は検証済みトークンのペイロード。
///
/// 既知のクレーム以外もすべて `extra` に保持し、デコード結果をそのままハンドラへ渡す。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// トークン発行者
    pub iss: String,

    /// トークンの対象オーディエンス
    pub aud: Audience,

    /// トークンの有効期限
    pub exp: NumericDate,

    /// ユーザーの一意識別子
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// トークンの発行時刻
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<NumericDate>,

    /// 付与された権限の一覧。保護ルートではこのクレームが必須。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,

    /// 上記以外のクレーム
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    /// 最初のオーディエンスを返す。
    pub fn audience(&self) -> Option<&str> {
        self.aud.0.first().map(String::as_str)
    }

    /// permissions を返す。クレームが無い場合は空。
    pub fn permission_list(&self) -> &[String] {
        self.permissions.as_deref().unwrap_or(&[])
    }
}

impl std::fmt::Display for Claims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Claims{{sub={:?}, iss={}, aud={:?}, permissions={:?}}}",
            self.sub,
            self.iss,
            self.audience(),
            self.permission_list(),
        )
    }
}

/// NumericDate は Unix 秒で表した時刻。小数も有効な値なので、
/// JSON の数値表現を丸めずにそのまま保持する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NumericDate(serde_json::Number);

impl NumericDate {
    /// 秒数を f64 で返す。
    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_f64().unwrap_or_default()
    }

    pub fn as_number(&self) -> &serde_json::Number {
        &self.0
    }
}

impl From<u64> for NumericDate {
    fn from(secs: u64) -> Self {
        Self(secs.into())
    }
}

/// Audience は JWT の aud Claim を表す。
/// 文字列または文字列配列のどちらも受け付ける。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Audience(pub Vec<String>);

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        self.0.iter().any(|a| a == audience)
    }
}

impl Serialize for Audience {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // 単一値は文字列として書き戻す
        match self.0.as_slice() {
            [single] => serializer.serialize_str(single),
            many => many.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Audience {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de;

        struct AudienceVisitor;

        impl<'de> de::Visitor<'de> for AudienceVisitor {
            type Value = Audience;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string or array of strings")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Audience(vec![v.to_string()]))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut values = Vec::new();
                while let Some(v) = seq.next_element::<String>()? {
                    values.push(v);
                }
                Ok(Audience(values))
            }
        }

        deserializer.deserialize_any(AudienceVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_keeps_unknown_claims() {
        let json = serde_json::json!({
            "iss": "https://fsndproject.au.auth0.com/",
            "aud": "homepage",
            "exp": 4102444800u64,
            "sub": "auth0|123",
            "permissions": ["get:drinks-detail"],
            "azp": "y6j3GsADmb2rOmBXaEN1ElwNbl35uayf",
            "scope": "openid profile",
        });

        let claims: Claims = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(claims.audience(), Some("homepage"));
        assert_eq!(claims.permission_list(), &["get:drinks-detail"]);
        assert_eq!(claims.extra["azp"], "y6j3GsADmb2rOmBXaEN1ElwNbl35uayf");

        // 書き戻しても元の JSON と一致する
        assert_eq!(serde_json::to_value(&claims).unwrap(), json);
    }

    #[test]
    fn test_audience_array() {
        let json = serde_json::json!({
            "iss": "iss",
            "aud": ["homepage", "https://fsndproject.au.auth0.com/userinfo"],
            "exp": 0,
        });
        let claims: Claims = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(claims.audience(), Some("homepage"));
        assert!(claims.aud.contains("https://fsndproject.au.auth0.com/userinfo"));
        assert_eq!(serde_json::to_value(&claims).unwrap()["aud"], json["aud"]);
    }

    #[test]
    fn test_missing_permissions_is_none() {
        let claims: Claims = serde_json::from_value(serde_json::json!({
            "iss": "iss",
            "aud": "aud",
            "exp": 0,
        }))
        .unwrap();
        assert!(claims.permissions.is_none());
        assert!(claims.permission_list().is_empty());
    }

    #[test]
    fn test_fractional_numeric_dates_are_kept() {
        let json = serde_json::json!({
            "iss": "iss",
            "aud": "homepage",
            "exp": 4102444800.5,
            "iat": 1700000000.25,
        });
        let claims: Claims = serde_json::from_value(json.clone()).unwrap();
        assert!((claims.exp.as_secs_f64() - 4_102_444_800.5).abs() < f64::EPSILON);
        assert!(
            (claims.iat.as_ref().unwrap().as_secs_f64() - 1_700_000_000.25).abs() < f64::EPSILON
        );
        assert_eq!(serde_json::to_value(&claims).unwrap(), json);
    }

    #[test]
    fn test_integer_numeric_date_stays_integer() {
        let date = NumericDate::from(1_700_000_000);
        assert_eq!(date.as_number().as_u64(), Some(1_700_000_000));
        assert_eq!(serde_json::to_string(&date).unwrap(), "1700000000");
    }

    #[test]
    fn test_claims_display() {
        let claims: Claims = serde_json::from_value(serde_json::json!({
            "iss": "iss",
            "aud": "homepage",
            "exp": 0,
            "sub": "user-1",
            "permissions": ["post:drinks"],
        }))
        .unwrap();
        let s = claims.to_string();
        assert!(s.contains("user-1"));
        assert!(s.contains("post:drinks"));
    }
}
