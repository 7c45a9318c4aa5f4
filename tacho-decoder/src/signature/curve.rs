//! Short Weierstrass arithmetic for the Brainpool curves
//!
//! Affine coordinates over `rsa::BigUint`, enough to check ECDSA signatures.
//! Only public values pass through here, so there is no constant-time
//! requirement.

use crate::certificates::Curve;
use rsa::BigUint;

// RFC 5639 domain parameters: p, a, b, Gx, Gy, n
const BRAINPOOL_P256R1: [&str; 6] = [
    "A9FB57DBA1EEA9BC3E660A909D838D726E3BF623D52620282013481D1F6E5377",
    "7D5A0975FC2C3057EEF67530417AFFE7FB8055C126DC5C6CE94A4B44F330B5D9",
    "26DC5C6CE94A4B44F330B5D9BBD77CBF958416295CF7E1CE6BCCDC18FF8C07B6",
    "8BD2AEB9CB7E57CB2C4B482FFC81B7AFB9DE27E1E3BD23C23A4453BD9ACE3262",
    "547EF835C3DAC4FD97F8461A14611DC9C27745132DED8E545C1D54C72F046997",
    "A9FB57DBA1EEA9BC3E660A909D838D718C397AA3B561A6F7901E0E82974856A7",
];

const BRAINPOOL_P384R1: [&str; 6] = [
    "8CB91E82A3386D280F5D6F7E50E641DF152F7109ED5456B412B1DA197FB71123ACD3A729901D1A71874700133107EC53",
    "7BC382C63D8C150C3C72080ACE05AFA0C2BEA28E4FB22787139165EFBA91F90F8AA5814A503AD4EB04A8C7DD22CE2826",
    "04A8C7DD22CE28268B39B55416F0447C2FB77DE107DCD2A62E880EA53EEB62D57CB4390295DBC9943AB78696FA504C11",
    "1D1C64F068CF45FFA2A63A81B7C13F6B8847A3E77EF14FE3DB7FCAFE0CBD10E8E826E03436D646AAEF87B2E247D4AF1E",
    "8ABE1D7520F9C2A45CB1EB8E95CFD55262B70B29FEEC5864E19C054FF99129280E4646217791811142820341263C5315",
    "8CB91E82A3386D280F5D6F7E50E641DF152F7109ED5456B31F166E6CAC0425A7CF3AB6AF6B7FC3103B883202E9046565",
];

const BRAINPOOL_P512R1: [&str; 6] = [
    "AADD9DB8DBE9C48B3FD4E6AE33C9FC07CB308DB3B3C9D20ED6639CCA703308717D4D9B009BC66842AECDA12AE6A380E62881FF2F2D82C68528AA6056583A48F3",
    "7830A3318B603B89E2327145AC234CC594CBDD8D3DF91610A83441CAEA9863BC2DED5D5AA8253AA10A2EF1C98B9AC8B57F1117A72BF2C7B9E7C1AC4D77FC94CA",
    "3DF91610A83441CAEA9863BC2DED5D5AA8253AA10A2EF1C98B9AC8B57F1117A72BF2C7B9E7C1AC4D77FC94CADC083E67984050B75EBAE5DD2809BD638016F723",
    "81AEE4BDD82ED9645A21322E9C4C6A9385ED9F70B5D916C1B43B62EEF4D0098EFF3B1F78E2D0D48D50D1687B93B97D5F7C6D5047406A5E688B352209BCB9F822",
    "7DDE385D566332ECC0EABFA9CF7822FDF209F70024A57B1AA000C55B881F8111B2DCDE494A5F485E5BCA4BD88A2763AED1CA2B2FA8F0540678CD1E0F3AD80892",
    "AADD9DB8DBE9C48B3FD4E6AE33C9FC07CB308DB3B3C9D20ED6639CCA70330870553E5C414CA92619418661197FAC10471DB1D381085DDADDB58796829CA90069",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Point {
    Infinity,
    Affine(BigUint, BigUint),
}

/// Domain parameters of a prime field curve `y^2 = x^3 + ax + b`
pub(crate) struct PrimeCurve {
    p: BigUint,
    a: BigUint,
    b: BigUint,
    g: Point,
    n: BigUint,
    size: usize,
}

fn parse(hex: &str) -> Option<BigUint> {
    BigUint::parse_bytes(hex.as_bytes(), 16)
}

impl PrimeCurve {
    /// Parameters for a Brainpool curve; `None` for any other curve
    pub(crate) fn brainpool(curve: Curve) -> Option<Self> {
        let params = match curve {
            Curve::BrainpoolP256r1 => &BRAINPOOL_P256R1,
            Curve::BrainpoolP384r1 => &BRAINPOOL_P384R1,
            Curve::BrainpoolP512r1 => &BRAINPOOL_P512R1,
            _ => return None,
        };
        Some(Self {
            p: parse(params[0])?,
            a: parse(params[1])?,
            b: parse(params[2])?,
            g: Point::Affine(parse(params[3])?, parse(params[4])?),
            n: parse(params[5])?,
            size: curve.field_size(),
        })
    }

    fn add_mod(&self, x: &BigUint, y: &BigUint) -> BigUint {
        (x + y) % &self.p
    }

    fn sub_mod(&self, x: &BigUint, y: &BigUint) -> BigUint {
        ((x % &self.p) + &self.p - (y % &self.p)) % &self.p
    }

    fn mul_mod(&self, x: &BigUint, y: &BigUint) -> BigUint {
        (x * y) % &self.p
    }

    /// Inverse by Fermat's little theorem; `p` is prime
    fn inv_mod(&self, x: &BigUint) -> BigUint {
        x.modpow(&(&self.p - BigUint::from(2u32)), &self.p)
    }

    fn is_on_curve(&self, x: &BigUint, y: &BigUint) -> bool {
        let lhs = self.mul_mod(y, y);
        let x3 = self.mul_mod(&self.mul_mod(x, x), x);
        let rhs = self.add_mod(&self.add_mod(&x3, &self.mul_mod(&self.a, x)), &self.b);
        lhs == rhs
    }

    fn double(&self, point: &Point) -> Point {
        let Point::Affine(x, y) = point else {
            return Point::Infinity;
        };
        if *y == BigUint::from(0u32) {
            return Point::Infinity;
        }
        let three = BigUint::from(3u32);
        let numerator = self.add_mod(&self.mul_mod(&three, &self.mul_mod(x, x)), &self.a);
        let denominator = self.add_mod(y, y);
        let lambda = self.mul_mod(&numerator, &self.inv_mod(&denominator));
        let x3 = self.sub_mod(&self.sub_mod(&self.mul_mod(&lambda, &lambda), x), x);
        let y3 = self.sub_mod(&self.mul_mod(&lambda, &self.sub_mod(x, &x3)), y);
        Point::Affine(x3, y3)
    }

    fn add(&self, left: &Point, right: &Point) -> Point {
        let (x1, y1, x2, y2) = match (left, right) {
            (Point::Infinity, other) | (other, Point::Infinity) => return other.clone(),
            (Point::Affine(x1, y1), Point::Affine(x2, y2)) => (x1, y1, x2, y2),
        };
        if x1 == x2 {
            if self.add_mod(y1, y2) == BigUint::from(0u32) {
                return Point::Infinity;
            }
            return self.double(left);
        }
        let lambda = self.mul_mod(&self.sub_mod(y2, y1), &self.inv_mod(&self.sub_mod(x2, x1)));
        let x3 = self.sub_mod(&self.sub_mod(&self.mul_mod(&lambda, &lambda), x1), x2);
        let y3 = self.sub_mod(&self.mul_mod(&lambda, &self.sub_mod(x1, &x3)), y1);
        Point::Affine(x3, y3)
    }

    fn multiply(&self, scalar: &BigUint, point: &Point) -> Point {
        let mut result = Point::Infinity;
        for byte in scalar.to_bytes_be() {
            for bit in (0..8).rev() {
                result = self.double(&result);
                if (byte >> bit) & 1 == 1 {
                    result = self.add(&result, point);
                }
            }
        }
        result
    }

    /// Decode an uncompressed SEC1 point and check it lies on the curve
    pub(crate) fn decode_point(&self, bytes: &[u8]) -> Option<Point> {
        if bytes.len() != 1 + 2 * self.size || bytes[0] != 0x04 {
            return None;
        }
        let x = BigUint::from_bytes_be(&bytes[1..1 + self.size]);
        let y = BigUint::from_bytes_be(&bytes[1 + self.size..]);
        if x >= self.p || y >= self.p || !self.is_on_curve(&x, &y) {
            return None;
        }
        Some(Point::Affine(x, y))
    }

    /// ECDSA verification of `r || s` over an already computed digest
    pub(crate) fn verify_prehash(&self, point: &[u8], digest: &[u8], signature: &[u8]) -> bool {
        let Some(public) = self.decode_point(point) else {
            return false;
        };
        if signature.len() != 2 * self.size {
            return false;
        }
        let zero = BigUint::from(0u32);
        let r = BigUint::from_bytes_be(&signature[..self.size]);
        let s = BigUint::from_bytes_be(&signature[self.size..]);
        if r == zero || s == zero || r >= self.n || s >= self.n {
            return false;
        }

        let mut e = BigUint::from_bytes_be(digest);
        let digest_bits = digest.len() * 8;
        let order_bits = self.n.bits();
        if digest_bits > order_bits {
            e = e >> (digest_bits - order_bits);
        }

        let w = s.modpow(&(&self.n - BigUint::from(2u32)), &self.n);
        let u1 = (&e * &w) % &self.n;
        let u2 = (&r * &w) % &self.n;
        let sum = self.add(&self.multiply(&u1, &self.g), &self.multiply(&u2, &public));
        match sum {
            Point::Infinity => false,
            Point::Affine(x, _) => x % &self.n == r,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generators_are_on_their_curves() {
        for curve in [
            Curve::BrainpoolP256r1,
            Curve::BrainpoolP384r1,
            Curve::BrainpoolP512r1,
        ] {
            let params = PrimeCurve::brainpool(curve).unwrap();
            let Point::Affine(x, y) = &params.g else {
                panic!("generator at infinity");
            };
            assert!(params.is_on_curve(x, y), "{:?}", curve);
        }
        assert!(PrimeCurve::brainpool(Curve::NistP256).is_none());
    }

    #[test]
    fn test_order_times_generator_is_infinity() {
        let params = PrimeCurve::brainpool(Curve::BrainpoolP256r1).unwrap();
        assert_eq!(params.multiply(&params.n, &params.g), Point::Infinity);
    }

    #[test]
    fn test_double_matches_add() {
        let params = PrimeCurve::brainpool(Curve::BrainpoolP256r1).unwrap();
        let doubled = params.double(&params.g);
        let tripled = params.add(&doubled, &params.g);
        assert_eq!(params.multiply(&BigUint::from(3u32), &params.g), tripled);
        assert_eq!(params.add(&params.g, &params.g), doubled);
    }

    #[test]
    fn test_rejects_point_off_curve() {
        let params = PrimeCurve::brainpool(Curve::BrainpoolP256r1).unwrap();
        let mut bytes = vec![0x04];
        bytes.extend_from_slice(&[0x01; 64]);
        assert!(params.decode_point(&bytes).is_none());
        assert!(params.decode_point(&[0x04]).is_none());
    }
}
