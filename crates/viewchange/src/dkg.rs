//! Drives one magic-block rotation's distributed key generation: each
//! committee member contributes a polynomial, exchanges shares, publishes
//! share-or-sign reports, and the survivors' shares combine into the next
//! committee's group key (spec.md §4.6).

use std::collections::{BTreeMap, BTreeSet};

use meridian_crypto::sign::bls::dkg::{self, Polynomial, VerificationVector};
use meridian_crypto::sign::bls::{BlsKeyPair, BlsPublicKey, BlsSecretKey, BlsSignature};
use meridian_types::app::{DkgKeyShare, PartyId, ShareOrSigns};

use crate::error::ViewChangeError;

/// Position in spec.md §4.6's phase sequence (SOSS is folded into the
/// `Share -> Publish` transition rather than given its own phase, since
/// the spec describes it as the artifact that transition produces).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Contribute,
    Share,
    Publish,
    Wait,
}

/// The result of a successful DKG round: the new committee's group public
/// key and this party's share of the corresponding group secret.
#[derive(Debug, Clone)]
pub struct DkgOutcome {
    pub group_public_key: BlsPublicKey,
    pub secret_key_share: BlsSecretKey,
    pub honest_set: BTreeSet<PartyId>,
}

/// Drives this party's side of one DKG round. `identity_keys` are the
/// committee's long-term BLS public keys in party-id order, used to
/// authenticate `DkgKeyShare` messages; this party's own long-term keypair
/// signs the shares it sends.
pub struct DkgMachine<'a> {
    party_id: PartyId,
    threshold: usize,
    identity_keypair: &'a BlsKeyPair,
    identity_keys: &'a [BlsPublicKey],
    phase: Phase,
    own_polynomial: Option<Polynomial>,
    contributions: BTreeMap<PartyId, VerificationVector>,
    received_shares: BTreeMap<PartyId, DkgKeyShare>,
    soss_reports: BTreeMap<PartyId, ShareOrSigns>,
}

impl<'a> DkgMachine<'a> {
    pub fn new(
        party_id: PartyId,
        threshold: usize,
        identity_keypair: &'a BlsKeyPair,
        identity_keys: &'a [BlsPublicKey],
    ) -> Self {
        Self {
            party_id,
            threshold,
            identity_keypair,
            identity_keys,
            phase: Phase::Start,
            own_polynomial: None,
            contributions: BTreeMap::new(),
            received_shares: BTreeMap::new(),
            soss_reports: BTreeMap::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Generates this party's degree-`threshold - 1` polynomial and
    /// returns its verification vector to broadcast as the MPK
    /// (`Start -> Contribute`).
    pub fn begin_contribute(&mut self) -> Result<VerificationVector, ViewChangeError> {
        let polynomial = Polynomial::generate(self.threshold).map_err(|e| ViewChangeError::Crypto(e.to_string()))?;
        let vector = polynomial.verification_vector();
        self.contributions.insert(self.party_id, vector.clone());
        self.own_polynomial = Some(polynomial);
        self.phase = Phase::Contribute;
        Ok(vector)
    }

    /// Records another party's published MPK.
    pub fn receive_contribution(
        &mut self,
        party: PartyId,
        vector: VerificationVector,
    ) -> Result<(), ViewChangeError> {
        if self.phase != Phase::Contribute {
            return Err(ViewChangeError::UnexpectedContribution(party));
        }
        self.contributions.insert(party, vector);
        Ok(())
    }

    /// Evaluates this party's polynomial at every known contributor's id
    /// and signs the resulting share, ready to send to each of them
    /// (`Contribute -> Share`).
    pub fn begin_share(&mut self) -> Result<Vec<(PartyId, DkgKeyShare)>, ViewChangeError> {
        let polynomial = self.own_polynomial.as_ref().ok_or(ViewChangeError::WrongPhase)?;
        let mut outgoing = Vec::new();
        for &party in self.contributions.keys() {
            if party == self.party_id {
                continue;
            }
            let scalar = polynomial.evaluate(party);
            let share_bytes = BlsSecretKey(scalar).to_bytes();
            let signature = self
                .identity_keypair
                .sign(&share_bytes)
                .map_err(|e| ViewChangeError::Crypto(e.to_string()))?;
            let share = DkgKeyShare {
                from_party: self.party_id,
                to_party: party,
                share: share_bytes,
                signature: signature.to_bytes(),
            };
            outgoing.push((party, share));
        }
        self.phase = Phase::Share;
        Ok(outgoing)
    }

    /// Verifies an incoming share's signature and its consistency with the
    /// sender's published MPK, then records it.
    pub fn receive_share(&mut self, share: DkgKeyShare) -> Result<(), ViewChangeError> {
        if self.phase != Phase::Share {
            return Err(ViewChangeError::UnexpectedShare(share.from_party));
        }
        let sender_key = self
            .identity_keys
            .get(share.from_party as usize)
            .ok_or(ViewChangeError::UnknownContributor(share.from_party))?;
        let signature = BlsSignature::from_bytes(&share.signature)
            .map_err(|e| ViewChangeError::Crypto(e.to_string()))?;
        sender_key
            .verify(&share.share, &signature)
            .map_err(|_| ViewChangeError::InvalidShareSignature(share.from_party))?;

        let vector = self
            .contributions
            .get(&share.from_party)
            .ok_or(ViewChangeError::UnknownContributor(share.from_party))?;
        let scalar = BlsSecretKey::from_bytes(&share.share)
            .map_err(|e| ViewChangeError::Crypto(e.to_string()))?
            .0;
        dkg::verify_share(&scalar, self.party_id, vector)
            .map_err(|_| ViewChangeError::InvalidShareValue(share.from_party))?;

        self.received_shares.insert(share.from_party, share);
        Ok(())
    }

    /// Builds this party's SOSS report: the full set of valid shares it
    /// holds if it received one from every contributor, or a signed
    /// complaint naming whoever it is missing a share from
    /// (`Share -> Publish`).
    pub fn begin_publish(&mut self) -> Result<ShareOrSigns, ViewChangeError> {
        let missing: BTreeSet<PartyId> = self
            .contributions
            .keys()
            .filter(|&&p| p != self.party_id && !self.received_shares.contains_key(&p))
            .copied()
            .collect();

        let report = if missing.is_empty() {
            ShareOrSigns::Shares(self.received_shares.clone())
        } else {
            let mut message = Vec::new();
            for party in &missing {
                message.extend_from_slice(&party.to_be_bytes());
            }
            let signature = self
                .identity_keypair
                .sign(&message)
                .map_err(|e| ViewChangeError::Crypto(e.to_string()))?;
            ShareOrSigns::Complaint {
                missing_or_invalid: missing,
                signature: signature.to_bytes(),
            }
        };

        self.soss_reports.insert(self.party_id, report.clone());
        self.phase = Phase::Publish;
        Ok(report)
    }

    /// Records another party's SOSS report.
    pub fn receive_soss(&mut self, party: PartyId, report: ShareOrSigns) {
        self.soss_reports.insert(party, report);
    }

    /// Determines the honest contributor set from every collected SOSS
    /// report, combines their group public key, and combines this party's
    /// secret key share. Fails if fewer than `threshold` contributors
    /// qualify, per spec.md §4.6's failure semantics (the previous magic
    /// block then remains active).
    pub fn finalize(&mut self) -> Result<DkgOutcome, ViewChangeError> {
        let contributor_ids: Vec<PartyId> = self.contributions.keys().copied().collect();
        let mut complaint_counts: BTreeMap<PartyId, usize> = BTreeMap::new();
        for report in self.soss_reports.values() {
            if let ShareOrSigns::Complaint { missing_or_invalid, .. } = report {
                for &party in missing_or_invalid {
                    *complaint_counts.entry(party).or_insert(0) += 1;
                }
            }
        }

        let honest_set: BTreeSet<PartyId> = contributor_ids
            .into_iter()
            .filter(|party| complaint_counts.get(party).copied().unwrap_or(0) < self.threshold)
            .collect();

        if honest_set.len() < self.threshold {
            return Err(ViewChangeError::QuorumNotReached);
        }

        let constant_terms: Vec<_> = honest_set
            .iter()
            .filter_map(|party| self.contributions.get(party))
            .filter_map(|vector| vector.0.first().cloned())
            .collect();
        let group_public_key = dkg::combine_group_public_key(&constant_terms);

        let received_scalars: Vec<_> = honest_set
            .iter()
            .filter(|&&party| party != self.party_id)
            .filter_map(|party| self.received_shares.get(party))
            .filter_map(|share| BlsSecretKey::from_bytes(&share.share).ok())
            .map(|secret| secret.0)
            .collect();
        let secret_key_share = dkg::combine_received_shares(&received_scalars);

        self.phase = Phase::Wait;
        Ok(DkgOutcome {
            group_public_key,
            secret_key_share,
            honest_set,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_keypairs(n: usize) -> Vec<BlsKeyPair> {
        (0..n).map(|_| BlsKeyPair::generate().expect("keygen")).collect()
    }

    #[test]
    fn three_party_dkg_with_threshold_two_succeeds() {
        let threshold = 2;
        let identities = identity_keypairs(3);
        let identity_keys: Vec<BlsPublicKey> = identities.iter().map(|k| k.public_key()).collect();

        let mut machines: Vec<DkgMachine> = (0..3)
            .map(|i| DkgMachine::new(i as PartyId, threshold, &identities[i], &identity_keys))
            .collect();

        let mpks: Vec<VerificationVector> = machines
            .iter_mut()
            .map(|m| m.begin_contribute().expect("contribute"))
            .collect();
        for (i, machine) in machines.iter_mut().enumerate() {
            for (j, mpk) in mpks.iter().enumerate() {
                if i != j {
                    machine
                        .receive_contribution(j as PartyId, mpk.clone())
                        .expect("receive contribution");
                }
            }
        }

        let all_shares: Vec<Vec<(PartyId, DkgKeyShare)>> = machines
            .iter_mut()
            .map(|m| m.begin_share().expect("begin share"))
            .collect();
        for (sender, outgoing) in all_shares.iter().enumerate() {
            for (recipient, share) in outgoing {
                machines[*recipient as usize]
                    .receive_share(share.clone())
                    .unwrap_or_else(|e| panic!("party {sender} share to {recipient} rejected: {e}"));
            }
        }

        let reports: Vec<ShareOrSigns> = machines
            .iter_mut()
            .map(|m| m.begin_publish().expect("begin publish"))
            .collect();
        for (i, machine) in machines.iter_mut().enumerate() {
            for (j, report) in reports.iter().enumerate() {
                if i != j {
                    machine.receive_soss(j as PartyId, report.clone());
                }
            }
        }

        let outcomes: Vec<DkgOutcome> = machines
            .iter_mut()
            .map(|m| m.finalize().expect("finalize"))
            .collect();

        let first_key = outcomes[0].group_public_key.clone();
        for outcome in &outcomes[1..] {
            assert_eq!(outcome.group_public_key, first_key);
        }
    }

    #[test]
    fn missing_share_from_one_party_still_meets_threshold() {
        let threshold = 2;
        let identities = identity_keypairs(3);
        let identity_keys: Vec<BlsPublicKey> = identities.iter().map(|k| k.public_key()).collect();
        let mut machines: Vec<DkgMachine> = (0..3)
            .map(|i| DkgMachine::new(i as PartyId, threshold, &identities[i], &identity_keys))
            .collect();

        let mpks: Vec<VerificationVector> = machines
            .iter_mut()
            .map(|m| m.begin_contribute().expect("contribute"))
            .collect();
        for (i, machine) in machines.iter_mut().enumerate() {
            for (j, mpk) in mpks.iter().enumerate() {
                if i != j {
                    machine.receive_contribution(j as PartyId, mpk.clone()).expect("ok");
                }
            }
        }

        let all_shares: Vec<Vec<(PartyId, DkgKeyShare)>> = machines
            .iter_mut()
            .map(|m| m.begin_share().expect("begin share"))
            .collect();
        // Party 2 never receives party 0's share (simulated drop).
        for (sender, outgoing) in all_shares.iter().enumerate() {
            for (recipient, share) in outgoing {
                if sender == 0 && *recipient == 2 {
                    continue;
                }
                machines[*recipient as usize].receive_share(share.clone()).expect("ok");
            }
        }

        let reports: Vec<ShareOrSigns> = machines
            .iter_mut()
            .map(|m| m.begin_publish().expect("begin publish"))
            .collect();
        assert!(matches!(reports[2], ShareOrSigns::Complaint { .. }));

        for (i, machine) in machines.iter_mut().enumerate() {
            for (j, report) in reports.iter().enumerate() {
                if i != j {
                    machine.receive_soss(j as PartyId, report.clone());
                }
            }
        }

        // Only one of three complained about party 0, below the
        // threshold of 2, so party 0 still qualifies.
        let outcome = machines[0].finalize().expect("finalize succeeds");
        assert_eq!(outcome.honest_set.len(), 3);
    }

    #[test]
    fn below_threshold_contributors_fails_the_round() {
        let threshold = 3;
        let identities = identity_keypairs(3);
        let identity_keys: Vec<BlsPublicKey> = identities.iter().map(|k| k.public_key()).collect();
        let mut machine = DkgMachine::new(0, threshold, &identities[0], &identity_keys);
        machine.begin_contribute().expect("contribute");
        // No other contributions arrive; only one contributor is known.
        let result = machine.finalize();
        assert!(matches!(result, Err(ViewChangeError::QuorumNotReached)));
    }
}
